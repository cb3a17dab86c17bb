use serde::{Deserialize, Serialize};

/// The six anomaly kinds the detector set can raise.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    RoasDrop,
    CpaHigh,
    ImpressionLossBudget,
    ImpressionLossRank,
    CtrDecline,
    BurnRate,
}

impl AlertType {
    pub const ALL: [Self; 6] = [
        Self::RoasDrop,
        Self::CpaHigh,
        Self::ImpressionLossBudget,
        Self::ImpressionLossRank,
        Self::CtrDecline,
        Self::BurnRate,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RoasDrop => "ROAS_DROP",
            Self::CpaHigh => "CPA_HIGH",
            Self::ImpressionLossBudget => "IMPRESSION_LOSS_BUDGET",
            Self::ImpressionLossRank => "IMPRESSION_LOSS_RANK",
            Self::CtrDecline => "CTR_DECLINE",
            Self::BurnRate => "BURN_RATE",
        }
    }

    /// Budget, rank and burn-rate anomalies cost money directly and are
    /// classified on the stricter bucket table.
    #[must_use]
    pub const fn is_high_stakes(&self) -> bool {
        matches!(
            self,
            Self::ImpressionLossBudget | Self::ImpressionLossRank | Self::BurnRate
        )
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AlertType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == upper)
            .ok_or_else(|| format!("unknown alert type '{s}'"))
    }
}
