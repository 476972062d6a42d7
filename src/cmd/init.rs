//! `checkpoint init`: generate a starter configuration file.
//!
//! Creates a YAML, JSON, or TOML config file with either a minimal or a
//! fully commented template. Both declare every compiled-in handler.

use std::path::PathBuf;

use crate::cli::{ConfigFormat, InitArgs};
use crate::error::CheckpointError;

pub fn execute(args: &InitArgs) -> Result<(), CheckpointError> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("checkpoint.{}", args.format.extension())));

    if output.exists() {
        return Err(CheckpointError::FileExists { path: output });
    }

    std::fs::write(&output, template(&args.format, args.full))?;
    println!("Created {}", output.display());
    Ok(())
}

const fn template(format: &ConfigFormat, full: bool) -> &'static str {
    match (format, full) {
        (ConfigFormat::Yaml, false) => YAML_MINIMAL,
        (ConfigFormat::Yaml, true) => YAML_FULL,
        // JSON has no comments, the full template only spells out defaults.
        (ConfigFormat::Json, false) => JSON_MINIMAL,
        (ConfigFormat::Json, true) => JSON_FULL,
        (ConfigFormat::Toml, false) => TOML_MINIMAL,
        (ConfigFormat::Toml, true) => TOML_FULL,
    }
}

const YAML_MINIMAL: &str = r#"# Checkpoint config

advice:
  group: user

groups:
  - id: user
    operations:
      - id: register
        markers: [open-access]
      - id: remove
  - id: open
    markers: [open-access]
    operations:
      - id: echo
      - id: greet
"#;

const YAML_FULL: &str = r#"# Checkpoint config
#
# Stages run in a fixed order: capture -> gate -> advice -> handler.

# Capability gate: a handler is admitted when its operation or its group
# carries the open-access marker. Everything else is rejected.
gate:
  enabled: true
  reject_status: 403          # any 4xx or 5xx

# Request/response body capture, logged once the response is complete.
capture:
  enabled: true

# Around-advice: timing, lifecycle events and phone-number normalization
# for every operation of one group. Remove to disable.
advice:
  group: user

# Handler groups. Ids must match the compiled-in handlers:
#   user: register (POST /api/user), remove (DELETE /api/user/{id})
#   open: echo (POST /open-api/echo), greet (GET /open-api/greet/{name})
groups:
  - id: user
    operations:
      - id: register
        markers: [open-access]   # method-level marker
      - id: remove               # no marker: rejected by the gate
  - id: open
    markers: [open-access]       # group-level marker covers every operation
    operations:
      - id: echo
      - id: greet
"#;

const JSON_MINIMAL: &str = r#"{
  "advice": { "group": "user" },
  "groups": [
    {
      "id": "user",
      "operations": [
        { "id": "register", "markers": ["open-access"] },
        { "id": "remove" }
      ]
    },
    {
      "id": "open",
      "markers": ["open-access"],
      "operations": [{ "id": "echo" }, { "id": "greet" }]
    }
  ]
}
"#;

const JSON_FULL: &str = r#"{
  "gate": { "enabled": true, "reject_status": 403 },
  "capture": { "enabled": true },
  "advice": { "group": "user" },
  "groups": [
    {
      "id": "user",
      "markers": [],
      "operations": [
        { "id": "register", "markers": ["open-access"] },
        { "id": "remove", "markers": [] }
      ]
    },
    {
      "id": "open",
      "markers": ["open-access"],
      "operations": [
        { "id": "echo", "markers": [] },
        { "id": "greet", "markers": [] }
      ]
    }
  ]
}
"#;

const TOML_MINIMAL: &str = r#"# Checkpoint config

[advice]
group = "user"

[[groups]]
id = "user"

[[groups.operations]]
id = "register"
markers = ["open-access"]

[[groups.operations]]
id = "remove"

[[groups]]
id = "open"
markers = ["open-access"]

[[groups.operations]]
id = "echo"

[[groups.operations]]
id = "greet"
"#;

const TOML_FULL: &str = r#"# Checkpoint config
#
# Stages run in a fixed order: capture -> gate -> advice -> handler.

# Capability gate: admits a handler when its operation or group carries
# the open-access marker.
[gate]
enabled = true
reject_status = 403   # any 4xx or 5xx

# Request/response body capture.
[capture]
enabled = true

# Around-advice scoped to one handler group. Remove to disable.
[advice]
group = "user"

[[groups]]
id = "user"

[[groups.operations]]
id = "register"
markers = ["open-access"]   # method-level marker

[[groups.operations]]
id = "remove"               # no marker: rejected by the gate

[[groups]]
id = "open"
markers = ["open-access"]   # group-level marker

[[groups.operations]]
id = "echo"

[[groups.operations]]
id = "greet"
"#;
