mod cron_job;
mod event;
mod user;

pub use cron_job::{CronJob, CronJobChanges, NewCronJob};
pub use event::{Event, EventStatus, NewEvent};
pub use user::User;
