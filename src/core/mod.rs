pub mod etl;
pub mod scheduler;

pub use crate::domain::model::LoadReport;
pub use crate::domain::ports::{Pipeline, StageData, Storage};
pub use crate::utils::error::Result;
pub use etl::{EtlEngine, Job};
pub use scheduler::{JobInfo, Scheduler};
