use anyhow::{anyhow, Context, Result};
use tracing::{debug, warn};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ConnectionExt as _, GetInputFocusReply};
use x11rb::protocol::xtest::ConnectionExt as _;
use x11rb::protocol::{xproto, xtest};
use x11rb::rust_connection::RustConnection;

use super::KeyOutputSink;
use crate::keyboard::{
    char_to_keystroke, KEY_A, KEY_APOSTROPHE, KEY_BACKSPACE, KEY_LEFTALT, KEY_LEFTCTRL,
    KEY_LEFTSHIFT, KEY_MINUS, KEY_Q, KEY_RIGHTALT, KEY_RIGHTCTRL, KEY_RIGHTSHIFT, KEY_SLASH,
};

// Released on connect and on drop so a run never starts or ends with a held modifier.
const COMMON_MODIFIER_KEYCODES: [u32; 6] = [
    KEY_LEFTSHIFT,
    KEY_RIGHTSHIFT,
    KEY_LEFTCTRL,
    KEY_RIGHTCTRL,
    KEY_LEFTALT,
    KEY_RIGHTALT,
];

fn evdev_to_x11_keycode(evdev_keycode: u32) -> Result<u8> {
    // On most Linux Xorg setups, X11 keycodes are evdev + 8.
    let x11 = evdev_keycode
        .checked_add(8)
        .ok_or_else(|| anyhow!("evdev keycode overflow"))?;
    u8::try_from(x11).map_err(|_| anyhow!("evdev keycode {evdev_keycode} out of range for X11"))
}

fn query_xtest(conn: &impl Connection) -> Result<()> {
    let ext = conn
        .extension_information(xtest::X11_EXTENSION_NAME)
        .context("failed to query X11 extension info")?;

    if ext.is_none() {
        return Err(anyhow!(
            "X11 backend requires the XTEST extension (not present on this X server)"
        ));
    }
    Ok(())
}

fn get_focus(conn: &impl Connection) -> Result<GetInputFocusReply> {
    conn.get_input_focus()
        .context("failed to request input focus")?
        .reply()
        .context("failed to read input focus reply")
}

fn keysyms_for_keycode(conn: &impl Connection, keycode: u8) -> Result<(u32, u32)> {
    let reply = conn
        .get_keyboard_mapping(keycode, 1)
        .context("failed to request keyboard mapping")?
        .reply()
        .context("failed to read keyboard mapping")?;

    if reply.keysyms_per_keycode == 0 {
        return Err(anyhow!("X server returned 0 keysyms per keycode"));
    }

    let at = |index: usize| {
        reply
            .keysyms
            .get(index)
            .copied()
            .unwrap_or(x11rb::NO_SYMBOL)
    };
    Ok((at(0), at(1)))
}

/// Check a few representative keys against the US layout. Latin-1 keysyms
/// equal their character codes.
fn validate_us_keymap(conn: &impl Connection) -> Result<()> {
    let checks: &[(u32, char, char)] = &[
        (KEY_A, 'a', 'A'),
        (KEY_Q, 'q', 'Q'),
        (KEY_MINUS, '-', '_'),
        (KEY_APOSTROPHE, '\'', '"'),
        (KEY_SLASH, '/', '?'),
    ];

    for &(evdev, plain, shifted) in checks {
        let keycode = evdev_to_x11_keycode(evdev)?;
        let (got0, got1) = keysyms_for_keycode(conn, keycode)?;

        if got0 == x11rb::NO_SYMBOL || got1 == x11rb::NO_SYMBOL {
            return Err(anyhow!(
                "X11 backend could not validate the keymap: keycode {keycode} returned NoSymbol ({got0:#x}/{got1:#x}). This backend assumes X11 keycodes are evdev+8."
            ));
        }
        if got0 != plain as u32 || got1 != shifted as u32 {
            return Err(anyhow!(
                "X11 backend requires a US keyboard layout, but keycode {keycode} maps to {got0:#x}/{got1:#x}. Try `setxkbmap us`."
            ));
        }
    }

    Ok(())
}

/// Types into the focused X11 window through XTEST fake key events.
pub struct X11Sink {
    conn: RustConnection,
    root: xproto::Window,
}

impl X11Sink {
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).context("failed to connect to X11")?;
        query_xtest(&conn)?;
        validate_us_keymap(&conn)?;

        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .ok_or_else(|| anyhow!("invalid X11 screen index"))?
            .root;

        let focus = get_focus(&conn)?;
        // PointerRoot means focus follows the pointer rather than a window.
        const POINTER_ROOT: xproto::Window = 1;
        if focus.focus == x11rb::NONE {
            return Err(anyhow!(
                "no X11 input focus detected; click into the target window before starting"
            ));
        }
        if focus.focus == POINTER_ROOT {
            warn!("X11 input focus follows the pointer; keep it over the target window");
        }

        let sink = Self { conn, root };
        sink.reset_modifiers_best_effort();
        debug!(screen = screen_num, "connected to X11 with XTEST");
        Ok(sink)
    }

    fn fake_key(&self, evdev_keycode: u32, pressed: bool) -> Result<()> {
        let keycode = evdev_to_x11_keycode(evdev_keycode)?;
        let type_ = if pressed {
            xproto::KEY_PRESS_EVENT
        } else {
            xproto::KEY_RELEASE_EVENT
        };
        self.conn
            .xtest_fake_input(type_, keycode, x11rb::CURRENT_TIME, self.root, 0, 0, 0)
            .context("failed to send XTEST fake input")?;
        Ok(())
    }

    fn tap(&self, evdev_keycode: u32, shift: bool) -> Result<()> {
        if shift {
            self.fake_key(KEY_LEFTSHIFT, true)?;
        }
        let tapped = self
            .fake_key(evdev_keycode, true)
            .and_then(|()| self.fake_key(evdev_keycode, false));
        if shift {
            self.fake_key(KEY_LEFTSHIFT, false)?;
        }
        tapped?;
        self.conn.flush().context("failed to flush X11 connection")?;
        Ok(())
    }

    fn reset_modifiers_best_effort(&self) {
        for keycode in COMMON_MODIFIER_KEYCODES {
            let _ = self.fake_key(keycode, false);
        }
        let _ = self.conn.flush();
    }
}

impl KeyOutputSink for X11Sink {
    fn name(&self) -> &'static str {
        "x11"
    }

    fn emit_char(&mut self, c: char) -> Result<()> {
        let stroke = char_to_keystroke(c)
            .ok_or_else(|| anyhow!("no US-QWERTY key for {c:?} (U+{:04X})", c as u32))?;
        self.tap(stroke.keycode, stroke.shift)
    }

    fn emit_backspace(&mut self) -> Result<()> {
        self.tap(KEY_BACKSPACE, false)
    }
}

impl Drop for X11Sink {
    fn drop(&mut self) {
        self.reset_modifiers_best_effort();
    }
}
