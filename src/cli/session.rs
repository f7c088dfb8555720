//! tasklink sign-in commands
//!
//! Local stand-in for the external identity provider: signin persists an
//! (email, name) pair, signout removes it, whoami shows what resolves.

use serde::Serialize;

use crate::cli::Globals;
use crate::error::Result;
use crate::events::EventKind;
use crate::identity;
use crate::output::{emit_success, HumanOutput};

#[derive(Serialize)]
struct SigninReport {
    email: String,
    name: String,
}

#[derive(Serialize)]
struct SignoutReport {
    signed_out: bool,
}

#[derive(Serialize)]
struct WhoamiReport {
    email: Option<String>,
    name: Option<String>,
}

pub fn run_signin(globals: &Globals, email: &str, name: &str) -> Result<()> {
    let signed_in = identity::sign_in(&globals.data_dir, email, name)?;

    globals.emit_event(
        EventKind::SignedIn,
        Some(&signed_in.email),
        serde_json::json!({ "name": signed_in.name }),
    );

    let report = SigninReport {
        email: signed_in.email.clone(),
        name: signed_in.name.clone(),
    };

    let mut human = HumanOutput::new(format!("tasklink signin: {}", signed_in.email));
    human.push_summary("email", signed_in.email);
    human.push_summary("name", signed_in.name);

    emit_success(globals.output(), "signin", &report, Some(&human))
}

pub fn run_signout(globals: &Globals) -> Result<()> {
    let existed = identity::sign_out(&globals.data_dir)?;

    if existed {
        globals.emit_event(EventKind::SignedOut, None, serde_json::json!({}));
    }

    let report = SignoutReport { signed_out: existed };

    let mut human = HumanOutput::new(if existed {
        "tasklink signout: done"
    } else {
        "tasklink signout: nothing to do"
    });
    if !existed {
        human.push_warning("no persisted sign-in found");
    }

    emit_success(globals.output(), "signout", &report, Some(&human))
}

pub fn run_whoami(globals: &Globals) -> Result<()> {
    let config = globals.config();
    let resolved = globals.identity(&config)?;

    let report = WhoamiReport {
        email: resolved.as_ref().map(|identity| identity.email.clone()),
        name: resolved.as_ref().map(|identity| identity.name.clone()),
    };

    let mut human = match &resolved {
        Some(identity) => {
            let mut human = HumanOutput::new(format!("tasklink whoami: {}", identity.email));
            human.push_summary("email", identity.email.clone());
            human.push_summary("name", identity.name.clone());
            human
        }
        None => HumanOutput::new("tasklink whoami: not signed in"),
    };
    if resolved.is_none() {
        human.push_warning("sign in with: tasklink signin <email> <name>");
    }

    emit_success(globals.output(), "whoami", &report, Some(&human))
}
