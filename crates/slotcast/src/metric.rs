//! Metric columns of the slot-availability exports.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One slot-availability metric. Variants are declared in input column order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Metric {
    #[default]
    SamedayOneHourAvailable,
    SamedayOneHourTheoretical,
    SamedayThreeHourAvailable,
    SamedayThreeHourTheoretical,
    SamedayFourHourAvailable,
    SamedayFourHourTheoretical,
    WithinTwoHoursAvailable,
    WithinTwoHoursTheoretical,
    NextdayOneHourAvailable,
    NextdayOneHourTheoretical,
    NextdayThreeHourAvailable,
    NextdayThreeHourTheoretical,
    NextdayFourHourAvailable,
    NextdayFourHourTheoretical,
}

impl Metric {
    /// Every metric, in input column order.
    pub const ALL: [Metric; 14] = [
        Metric::SamedayOneHourAvailable,
        Metric::SamedayOneHourTheoretical,
        Metric::SamedayThreeHourAvailable,
        Metric::SamedayThreeHourTheoretical,
        Metric::SamedayFourHourAvailable,
        Metric::SamedayFourHourTheoretical,
        Metric::WithinTwoHoursAvailable,
        Metric::WithinTwoHoursTheoretical,
        Metric::NextdayOneHourAvailable,
        Metric::NextdayOneHourTheoretical,
        Metric::NextdayThreeHourAvailable,
        Metric::NextdayThreeHourTheoretical,
        Metric::NextdayFourHourAvailable,
        Metric::NextdayFourHourTheoretical,
    ];

    /// Column name, also used as the partition file name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::SamedayOneHourAvailable => "sameday_1h_available_slots_number",
            Metric::SamedayOneHourTheoretical => "sameday_1h_theoretical_slots_number",
            Metric::SamedayThreeHourAvailable => "sameday_3h_available_slots_number",
            Metric::SamedayThreeHourTheoretical => "sameday_3h_theoretical_slots_number",
            Metric::SamedayFourHourAvailable => "sameday_4h_available_slots_number",
            Metric::SamedayFourHourTheoretical => "sameday_4h_theoretical_slots_number",
            Metric::WithinTwoHoursAvailable => "w2h_available_slots_number",
            Metric::WithinTwoHoursTheoretical => "w2h_theoretical_slots_number",
            Metric::NextdayOneHourAvailable => "nextday_1h_available_slots_number",
            Metric::NextdayOneHourTheoretical => "nextday_1h_theoretical_slots_number",
            Metric::NextdayThreeHourAvailable => "nextday_3h_available_slots_number",
            Metric::NextdayThreeHourTheoretical => "nextday_3h_theoretical_slots_number",
            Metric::NextdayFourHourAvailable => "nextday_4h_available_slots_number",
            Metric::NextdayFourHourTheoretical => "nextday_4h_theoretical_slots_number",
        }
    }

    /// Position among the metric columns.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|metric| metric.as_str() == s)
            .ok_or_else(|| format!("unknown metric '{s}'"))
    }
}

impl TryFrom<String> for Metric {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Metric> for String {
    fn from(metric: Metric) -> Self {
        metric.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_order_matches_index() {
        for (i, metric) in Metric::ALL.iter().enumerate() {
            assert_eq!(metric.index(), i);
        }
        assert_eq!(Metric::ALL[6].as_str(), "w2h_available_slots_number");
    }

    #[test]
    fn test_names_round_trip_through_from_str() {
        for metric in Metric::ALL {
            assert_eq!(metric.as_str().parse::<Metric>(), Ok(metric));
        }
        assert!("sameday_2h_available_slots_number".parse::<Metric>().is_err());
    }

    #[test]
    fn test_default_metric() {
        assert_eq!(Metric::default().as_str(), "sameday_1h_available_slots_number");
    }
}
