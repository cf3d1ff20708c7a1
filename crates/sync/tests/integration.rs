#![allow(unused_crate_dependencies)]

#[path = "integration/common/mod.rs"]
mod common;

#[path = "integration/properties.rs"]
mod properties;

#[path = "integration/driver.rs"]
mod driver;

#[path = "integration/scenario.rs"]
mod scenario;
