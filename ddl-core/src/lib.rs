pub mod catalog;
pub mod commands;
pub mod config;
pub mod deadline;
pub mod detect;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod known;
pub mod program;
pub mod render;
pub mod scheduler;
pub mod storage;
pub mod subscriptions;

pub use catalog::{Catalog, CatalogDocument, SharedCatalog, Source};
pub use commands::Commands;
pub use config::AppConfig;
pub use detect::{detect_changes, find_upcoming, ChangeSet};
pub use dispatch::{dispatch, plan, Deliver, DispatchReport, Outgoing, ReminderLog};
pub use engine::{Engine, PassReport, RefreshState};
pub use error::{CommandError, DeliveryError, FetchError, PersistError, SchedulerError};
pub use known::KnownStore;
pub use program::{parse_tag_filter, Program};
pub use scheduler::{spawn_scheduler, SchedulerConfig, SchedulerHandle};
pub use storage::BlobFile;
pub use subscriptions::{SubscriptionMap, SubscriptionRegistry, TagFilter};
