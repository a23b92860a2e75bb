//! Domain layer containing tracking entities and logic.
//!
//! Everything here is independent of HTTP and of the concrete store. The
//! classification and resolution functions are pure; persistence goes
//! through the traits in [`repositories`].
//!
//! # Architecture
//!
//! - [`entities`] - Tracked links, click events, daily rollups
//! - [`repositories`] - Data access trait definitions
//! - [`device`] - Device classification from the `User-Agent`
//! - [`bot`] - Automated traffic detection
//! - [`destination`] - Destination resolution with fallbacks
//! - [`pending_click`] - Click handed from the request path to the worker
//! - [`click_worker`] - Asynchronous click recording
//!
//! # Click Processing Flow
//!
//! 1. The redirect handler resolves the link and answers with a 302
//! 2. A [`pending_click::PendingClick`] is sent to a bounded channel
//! 3. [`click_worker::run_click_worker`] inserts the click event with retries
//! 4. The day's rollup is incremented via [`repositories::MetricsRepository`]

pub mod bot;
pub mod click_worker;
pub mod destination;
pub mod device;
pub mod entities;
pub mod pending_click;
pub mod repositories;
