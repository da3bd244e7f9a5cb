use std::cell::RefCell;
use std::ffi::OsStr;

use miette::{miette, Result};

use crate::options::{Options, Strictness};

#[derive(Clone, Copy)]
struct Env {
    strictness: Option<Strictness>,
    max_steps: Option<usize>,
}

thread_local! {
    /// Must only be mutated within `set_env`
    static ENV: RefCell<Option<Env>> = const { RefCell::new(None) };
}

/// Read `SIM85_STRICT` and `SIM85_MAX_STEPS`. Unset or empty variables leave the defaults.
pub fn init() -> Result<()> {
    let strictness = match var("SIM85_STRICT") {
        Some(value) => Some(
            value
                .parse::<Strictness>()
                .map_err(|err| miette!("SIM85_STRICT: {err}"))?,
        ),
        None => None,
    };
    let max_steps = match var("SIM85_MAX_STEPS") {
        Some(value) => Some(
            value
                .parse::<usize>()
                .map_err(|err| miette!("SIM85_MAX_STEPS: {err}"))?,
        ),
        None => None,
    };
    set_env(Env {
        strictness,
        max_steps,
    });
    Ok(())
}

/// Defaults for new sessions, with environment overrides applied.
pub fn options() -> Options {
    with_env(|env| {
        let defaults = Options::default();
        Options {
            strictness: env.strictness.unwrap_or(defaults.strictness),
            max_steps: env.max_steps.unwrap_or(defaults.max_steps),
        }
    })
}

fn set_env(value: Env) {
    ENV.with(|env| {
        let mut env = env.borrow_mut();
        assert!(
            env.is_none(),
            "tried to initialize environment state multiple times"
        );
        *env = Some(value);
    });
}

fn with_env<F, R>(callback: F) -> R
where
    F: Fn(&Env) -> R,
{
    ENV.with(|env| {
        let env = env.borrow();
        let env = env.unwrap_or_else(|| {
            panic!("tried to access environment state before initialization");
        });
        callback(&env)
    })
}

fn var(name: impl AsRef<OsStr>) -> Option<String> {
    std::env::var(name.as_ref()).ok().filter(|v| !v.trim().is_empty())
}
