pub mod directory;
pub mod metrics;
pub mod notifier;
pub mod store;

pub use directory::{CampaignDirectory, DirectoryError};
pub use metrics::{MetricsProvider, ProviderError};
pub use notifier::{ChatPoster, EmailSender, NotificationError, RealtimePublisher};
pub use store::{AlertFilter, AlertPage, AlertStore, CreateOutcome, Pagination, StoreError};
