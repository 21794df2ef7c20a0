//! Eventing Experience Test
//!
//! End-to-end check of the event display app running on Knative Eventing:
//! - Loads the events page in a headless browser (Playwright)
//! - Creates a `PingSource` with kubectl and waits for it to deliver
//! - Decides pass/fail by substring checks on the rendered page
//! - Always deletes the ping source and clears the event store afterwards
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  ExperienceRunner::run()                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  probe(/v1/events)        PageSource  (Playwright)          │
//! │  contains("No events found")?                               │
//! │  apply_resource(manifest) ClusterCli  (kubectl apply -f)    │
//! │  sleep(convergence)                                         │
//! │  probe(/v1/events)                                          │
//! │  contains("Hello world!")?                                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  cleanup (every path)                                       │
//! │    delete_resource()      ClusterCli  (kubectl delete)      │
//! │    clear_all()            RemoteStore (?deleteAll=true)     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod browser;
pub mod cluster;
pub mod config;
pub mod error;
pub mod remote;
pub mod runner;
pub mod snapshot;

pub use config::{ExperienceConfig, Scenario};
pub use error::{ExperienceError, ExperienceResult};
pub use runner::{ExperienceRunner, Phase, RunReport};
pub use snapshot::{PageSnapshot, TestOutcome};
