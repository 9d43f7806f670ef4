use serde::{Deserialize, Serialize};

/// Opening hours for one weekday, `open`/`close` as `HH:MM` strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpeningHours {
    pub day: String,
    pub open: String,
    pub close: String,
}

/// Weekly opening-hours table. Days without an entry are closed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessHours {
    pub days: Vec<OpeningHours>,
}

impl Default for BusinessHours {
    fn default() -> Self {
        let mut days: Vec<OpeningHours> = ["mon", "tue", "wed", "thu", "fri"]
            .iter()
            .map(|d| OpeningHours {
                day: (*d).to_string(),
                open: "08:00".to_string(),
                close: "18:00".to_string(),
            })
            .collect();
        days.push(OpeningHours {
            day: "sat".to_string(),
            open: "10:00".to_string(),
            close: "16:00".to_string(),
        });
        Self { days }
    }
}

impl BusinessHours {
    pub fn from_json(s: &str) -> anyhow::Result<Self> {
        let hours: BusinessHours = serde_json::from_str(s)?;
        for entry in &hours.days {
            parse_weekday(&entry.day)?;
            parse_time(&entry.open)?;
            parse_time(&entry.close)?;
            if entry.open >= entry.close {
                return Err(anyhow::anyhow!(
                    "opening time {} is not before closing time {}",
                    entry.open,
                    entry.close
                ));
            }
        }
        Ok(hours)
    }

    pub fn for_date(&self, date: &chrono::NaiveDate) -> Option<&OpeningHours> {
        let weekday = date.format("%a").to_string().to_lowercase();
        self.days.iter().find(|h| h.day.to_lowercase() == weekday)
    }

    pub fn is_closed(&self, date: &chrono::NaiveDate) -> bool {
        self.for_date(date).is_none()
    }

    pub fn to_human_readable(&self) -> String {
        if self.days.is_empty() {
            return String::new();
        }

        let day_order = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

        let mut sorted: Vec<&OpeningHours> = self.days.iter().collect();
        sorted.sort_by_key(|h| {
            day_order
                .iter()
                .position(|d| *d == h.day.to_lowercase())
                .unwrap_or(7)
        });

        sorted
            .iter()
            .map(|h| {
                let day = capitalize(&h.day);
                format!("{day}: {}-{}", h.open, h.close)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn capitalize(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().to_string() + &c.as_str().to_lowercase(),
    }
}

fn parse_weekday(s: &str) -> anyhow::Result<()> {
    match s.to_lowercase().as_str() {
        "mon" | "tue" | "wed" | "thu" | "fri" | "sat" | "sun" => Ok(()),
        _ => Err(anyhow::anyhow!("invalid weekday: {s}")),
    }
}

/// Minutes since midnight for an `HH:MM` string.
pub fn parse_time(s: &str) -> anyhow::Result<i64> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 2 || parts[0].len() != 2 || parts[1].len() != 2 {
        return Err(anyhow::anyhow!("invalid time format: {s}"));
    }
    let hour: i64 = parts[0]
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid hour in: {s}"))?;
    let minute: i64 = parts[1]
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid minute in: {s}"))?;
    if !(0..24).contains(&hour) || !(0..60).contains(&minute) {
        return Err(anyhow::anyhow!("time out of range: {s}"));
    }
    Ok(hour * 60 + minute)
}
