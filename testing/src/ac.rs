use std::sync::Arc;
use wardenac::platform::{
    Builder,
    Platform,
};
use wardencore::clock::FixedClock;
use wardenrbac::Engine;

use crate::{
    sqlite::create_seeded_sqlite_backend,
    world,
};

/// A platform over the seeded world, with its clock frozen at
/// [`world::NOW`].
pub async fn create_sqlite_platform(engine: Engine) -> anyhow::Result<Arc<Platform>> {
    let platform = Builder::new()
        .access_platform(create_seeded_sqlite_backend().await?)
        .engine(engine)
        .clock(FixedClock(world::NOW))
        .build()?;
    Ok(platform)
}
