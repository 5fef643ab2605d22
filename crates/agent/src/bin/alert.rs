//! `loadwatch-alert` -- reference notification handler.
//!
//! Reads the event id from `TROUBLED_DS` and writes `proc_alert` or
//! `mem_alert` into `LOADWATCH_ALERT_DIR` (default `/`). Exits non-zero for
//! a missing or unknown event id.

use anyhow::Context;
use loadwatch_agent::alert::{write_alert, AlertConfig};
use loadwatch_core::event::{parse_event_id, ENV_EVENT_ID};

fn main() -> anyhow::Result<()> {
    let raw = std::env::var(ENV_EVENT_ID).with_context(|| format!("{ENV_EVENT_ID} is not set"))?;
    let kind = parse_event_id(&raw)?;

    let config = AlertConfig::from_env();
    let path = write_alert(&config.alert_dir, kind)?;
    println!("{kind}: wrote {}", path.display());

    Ok(())
}
