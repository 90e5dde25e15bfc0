// SPDX-License-Identifier: GPL-3.0-only

//! Xlib/XTest implementation of [`InputHost`].
//!
//! Every call opens its own display connection and closes it before
//! returning; no connection is cached between calls. Key events are
//! synthesized with `XTestFakeKeyEvent`, lock state is read from the pointer
//! modifier mask, and glyph lookups use `XGetKeyboardMapping`.

use super::{HostQueryError, InputHost, KeyEvent, LockKey};
use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_uint, c_void};
use std::ptr;
use ::x11::{xlib, xtest};

/// `CurrentTime` for XTest event delays.
const CURRENT_TIME: std::os::raw::c_ulong = 0;

/// Number of core modifier rows (Shift, Lock, Control, Mod1..Mod5).
const MODIFIER_ROWS: usize = 8;

/// Valid X11 keycode range.
const MIN_KEYCODE: u32 = 8;
const MAX_KEYCODE: u32 = 255;

/// Short-lived display connection, closed on drop.
struct Connection {
    display: *mut xlib::Display,
}

impl Connection {
    fn open() -> Result<Self, HostQueryError> {
        // SAFETY: a null name selects $DISPLAY; a null return is handled.
        let display = unsafe { xlib::XOpenDisplay(ptr::null()) };
        if display.is_null() {
            return Err(HostQueryError::DisplayUnavailable);
        }
        Ok(Self { display })
    }

    fn root(&self) -> xlib::Window {
        // SAFETY: display is a live connection.
        unsafe { xlib::XDefaultRootWindow(self.display) }
    }

    /// Modifier mask bits whose row contains `keycode`.
    fn modifier_mask(&self, keycode: xlib::KeyCode) -> Result<c_uint, HostQueryError> {
        // SAFETY: display is live; the returned map is freed below.
        let map = unsafe { xlib::XGetModifierMapping(self.display) };
        if map.is_null() {
            return Err(HostQueryError::InvalidReply(
                "XGetModifierMapping returned nothing".to_string(),
            ));
        }

        let mut mask: c_uint = 0;
        // SAFETY: modifiermap holds MODIFIER_ROWS * max_keypermod entries.
        unsafe {
            let per_row = usize::try_from((*map).max_keypermod).unwrap_or(0);
            let codes = std::slice::from_raw_parts((*map).modifiermap, MODIFIER_ROWS * per_row);
            for (row, row_codes) in codes.chunks(per_row.max(1)).enumerate() {
                if row_codes.contains(&keycode) {
                    mask |= 1 << row;
                }
            }
            xlib::XFreeModifiermap(map);
        }
        Ok(mask)
    }

    fn pointer_mask(&self) -> Result<c_uint, HostQueryError> {
        let mut root_return: xlib::Window = 0;
        let mut child_return: xlib::Window = 0;
        let (mut root_x, mut root_y, mut win_x, mut win_y): (c_int, c_int, c_int, c_int) =
            (0, 0, 0, 0);
        let mut mask: c_uint = 0;

        // SAFETY: every out-pointer refers to a local.
        let ok = unsafe {
            xlib::XQueryPointer(
                self.display,
                self.root(),
                &mut root_return,
                &mut child_return,
                &mut root_x,
                &mut root_y,
                &mut win_x,
                &mut win_y,
                &mut mask,
            )
        };
        if ok == 0 {
            return Err(HostQueryError::InvalidReply(
                "pointer is not on the default screen".to_string(),
            ));
        }
        Ok(mask)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // SAFETY: display was opened by XOpenDisplay and is closed once.
        unsafe {
            xlib::XCloseDisplay(self.display);
        }
    }
}

/// X11 host, stateless between calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct X11Host;

impl X11Host {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl InputHost for X11Host {
    fn query_lock(&self, key: LockKey) -> Result<bool, HostQueryError> {
        let conn = Connection::open()?;

        // SAFETY: display is live.
        let keycode =
            unsafe { xlib::XKeysymToKeycode(conn.display, xlib::KeySym::from(key.keysym())) };
        if keycode == 0 {
            return Err(HostQueryError::NoSymbol(key.keysym()));
        }

        let mask = conn.modifier_mask(keycode)?;
        if mask == 0 {
            return Err(HostQueryError::NoSymbol(key.keysym()));
        }

        Ok(conn.pointer_mask()? & mask != 0)
    }

    fn keyboard_mapping(&self, keycode: u32) -> Result<Vec<u32>, HostQueryError> {
        if !(MIN_KEYCODE..=MAX_KEYCODE).contains(&keycode) {
            return Err(HostQueryError::InvalidReply(format!(
                "keycode {} is out of range",
                keycode
            )));
        }

        let conn = Connection::open()?;
        let mut per_keycode: c_int = 0;

        // SAFETY: keycode is in range; the returned array is freed below.
        let syms = unsafe {
            xlib::XGetKeyboardMapping(conn.display, keycode as xlib::KeyCode, 1, &mut per_keycode)
        };
        if syms.is_null() {
            return Err(HostQueryError::InvalidReply(format!(
                "no keyboard mapping for keycode {}",
                keycode
            )));
        }

        let count = usize::try_from(per_keycode).unwrap_or(0);
        // SAFETY: XGetKeyboardMapping returns `per_keycode` keysyms for one keycode.
        let keysyms = unsafe {
            let slice = std::slice::from_raw_parts(syms, count);
            let keysyms = slice.iter().map(|k| *k as u32).collect();
            xlib::XFree(syms.cast::<c_void>());
            keysyms
        };
        Ok(keysyms)
    }

    fn send_key_events(&self, events: &[KeyEvent]) -> Result<(), HostQueryError> {
        let conn = Connection::open()?;

        for event in events {
            // SAFETY: display is live; XTest ignores unknown keycodes.
            unsafe {
                xtest::XTestFakeKeyEvent(
                    conn.display,
                    event.keycode as c_uint,
                    c_int::from(event.is_press()),
                    CURRENT_TIME,
                );
            }
        }

        // SAFETY: display is live.
        unsafe {
            xlib::XFlush(conn.display);
        }
        Ok(())
    }

    fn destroy_window_named(&self, name: &str) -> Result<bool, HostQueryError> {
        let conn = Connection::open()?;

        let mut root_return: xlib::Window = 0;
        let mut parent_return: xlib::Window = 0;
        let mut children: *mut xlib::Window = ptr::null_mut();
        let mut count: c_uint = 0;

        // SAFETY: out-pointers refer to locals; children is freed below.
        let status = unsafe {
            xlib::XQueryTree(
                conn.display,
                conn.root(),
                &mut root_return,
                &mut parent_return,
                &mut children,
                &mut count,
            )
        };
        if status == 0 {
            return Err(HostQueryError::InvalidReply("XQueryTree failed".to_string()));
        }
        if children.is_null() {
            return Ok(false);
        }

        let mut found = false;
        // SAFETY: XQueryTree returned `count` window ids.
        unsafe {
            let windows = std::slice::from_raw_parts(children, count as usize);
            for window in windows {
                let mut window_name: *mut c_char = ptr::null_mut();
                if xlib::XFetchName(conn.display, *window, &mut window_name) == 0
                    || window_name.is_null()
                {
                    continue;
                }

                let matches = CStr::from_ptr(window_name).to_bytes() == name.as_bytes();
                xlib::XFree(window_name.cast::<c_void>());

                if matches {
                    tracing::debug!("Destroying window '{}' (0x{:x})", name, window);
                    xlib::XDestroyWindow(conn.display, *window);
                    xlib::XFlush(conn.display);
                    found = true;
                    break;
                }
            }
            xlib::XFree(children.cast::<c_void>());
        }

        Ok(found)
    }
}
