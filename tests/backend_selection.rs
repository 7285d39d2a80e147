use std::ffi::OsString;
use std::sync::{Mutex, OnceLock};

use typist::output::{resolve_backend, OutputBackend};
use typist::supervisor::ExecutionMode;

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

struct EnvRestore {
    display: Option<OsString>,
}

impl EnvRestore {
    fn snapshot() -> Self {
        Self {
            display: std::env::var_os("DISPLAY"),
        }
    }
}

impl Drop for EnvRestore {
    fn drop(&mut self) {
        // SAFETY: every env mutation in this file happens under `env_lock()`.
        match &self.display {
            Some(v) => unsafe { std::env::set_var("DISPLAY", v) },
            None => unsafe { std::env::remove_var("DISPLAY") },
        }
    }
}

fn unset(name: &str) {
    // SAFETY: callers hold the global test mutex from `env_lock()`.
    unsafe { std::env::remove_var(name) };
}

fn set(name: &str, value: &str) {
    // SAFETY: callers hold the global test mutex from `env_lock()`.
    unsafe { std::env::set_var(name, value) };
}

#[test]
fn auto_without_display_falls_back_to_console() {
    let _guard = env_lock().lock().unwrap();
    let _restore = EnvRestore::snapshot();

    unset("DISPLAY");

    let resolved = resolve_backend(OutputBackend::Auto).expect("auto always resolves");
    assert_eq!(resolved, OutputBackend::Console);
    assert_eq!(ExecutionMode::for_backend(resolved), ExecutionMode::Blocking);
}

#[test]
fn auto_with_display_prefers_x11_when_compiled_in() {
    let _guard = env_lock().lock().unwrap();
    let _restore = EnvRestore::snapshot();

    set("DISPLAY", ":0");
    let resolved = resolve_backend(OutputBackend::Auto).expect("auto always resolves");

    #[cfg(feature = "x11")]
    {
        assert_eq!(resolved, OutputBackend::X11);
        assert_eq!(ExecutionMode::for_backend(resolved), ExecutionMode::Background);
    }

    #[cfg(not(feature = "x11"))]
    assert_eq!(resolved, OutputBackend::Console);
}

#[test]
fn explicit_x11_is_rejected_or_accepted() {
    let _guard = env_lock().lock().unwrap();
    let _restore = EnvRestore::snapshot();

    unset("DISPLAY");

    #[cfg(feature = "x11")]
    {
        let resolved = resolve_backend(OutputBackend::X11).expect("should resolve");
        assert_eq!(resolved, OutputBackend::X11);
    }

    #[cfg(not(feature = "x11"))]
    {
        let err = resolve_backend(OutputBackend::X11).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("X11"));
        assert!(msg.contains("disabled"));
    }
}

#[test]
fn explicit_console_is_always_available() {
    let resolved = resolve_backend(OutputBackend::Console).expect("should resolve");
    assert_eq!(resolved, OutputBackend::Console);
    assert!(!resolved.injects_keys());
}
