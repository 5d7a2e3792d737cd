use serde::{Deserialize, Serialize};

/// Requirements the architecture was designed against.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Constraints {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compliance: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_monthly: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<String>,
    #[serde(default, skip_serializing_if = "is_zero_f64")]
    pub latency_ms: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_residency: Vec<String>,
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub throughput_rps: u64,
}

fn is_zero_f64(v: &f64) -> bool {
    *v == 0.0
}

fn is_zero_u64(v: &u64) -> bool {
    *v == 0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentCost {
    pub component_id: String,
    pub service: String,
    pub monthly: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hourly: Option<f64>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

/// Pre-computed pricing attached to a spec. Nothing in this crate prices
/// components; estimates come from an external catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostEstimate {
    pub monthly_total: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub breakdown: Vec<ComponentCost>,
    #[serde(default)]
    pub data_transfer_monthly: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "today")]
    pub as_of: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn today() -> String {
    chrono::Utc::now().date_naive().to_string()
}

impl CostEstimate {
    pub fn new(monthly_total: f64) -> Self {
        Self {
            monthly_total,
            breakdown: Vec::new(),
            data_transfer_monthly: 0.0,
            currency: default_currency(),
            as_of: today(),
        }
    }

    pub fn with_line(mut self, component_id: &str, service: &str, monthly: f64) -> Self {
        self.breakdown.push(ComponentCost {
            component_id: component_id.to_string(),
            service: service.to_string(),
            monthly,
            hourly: None,
            notes: String::new(),
        });
        self
    }

    /// Monthly cost of one component, if the breakdown lists it.
    pub fn component_monthly(&self, component_id: &str) -> Option<f64> {
        self.breakdown
            .iter()
            .find(|line| line.component_id == component_id)
            .map(|line| line.monthly)
    }
}

/// Round to cents.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `$1,234.50` style formatting (sign is the caller's business).
pub fn format_usd(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::new();
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("${}.{:02}", grouped, cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(48.604), 48.6);
        assert_eq!(round2(-12.344), -12.34);
        assert_eq!(round2(148.6 - 100.0), 48.6);
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(0.0), "$0.00");
        assert_eq!(format_usd(148.6), "$148.60");
        assert_eq!(format_usd(1234567.891), "$1,234,567.89");
        assert_eq!(format_usd(-266.0), "$266.00");
    }

    #[test]
    fn test_component_monthly_lookup() {
        let estimate = CostEstimate::new(100.0)
            .with_line("web", "ec2", 30.0)
            .with_line("db", "rds", 70.0);
        assert_eq!(estimate.component_monthly("db"), Some(70.0));
        assert_eq!(estimate.component_monthly("cache"), None);
        assert_eq!(estimate.currency, "USD");
    }
}
