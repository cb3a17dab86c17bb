pub mod alert;
pub mod campaign;
pub mod snapshot;

pub use alert::{
    Alert, AlertCandidate, AlertDetail, AlertUpdate, BurnRateDetail, CpaHighDetail,
    CtrDeclineDetail, ImpressionLossDetail, RoasDropDetail,
};
pub use campaign::{Campaign, CampaignStatus};
pub use snapshot::{CampaignMetrics, MetricsSnapshot};
