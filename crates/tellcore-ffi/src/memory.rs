//! String marshaling across the driver boundary
//!
//! Two ownership rules apply and never mix:
//!
//! - **Caller-owned** buffers ([`CallerString`]) are allocated here for input
//!   parameters and freed here, on drop, once the call has returned.
//! - **Library-owned** buffers ([`LibraryString`]) are returned by the driver
//!   and go back through `tdReleaseString` exactly once, also on drop.
//!
//! Text read from the driver is decoded lossily: invalid UTF-8 sequences
//! become U+FFFD rather than an error, since the driver stores whatever
//! bytes its configuration file holds.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Error, Result};
use crate::sys::NativeLibrary;

/// Live caller-owned buffers across the whole process
static OUTSTANDING_CALLER_BUFFERS: AtomicUsize = AtomicUsize::new(0);

/// A NUL-terminated UTF-8 buffer allocated by this crate for an input
/// parameter.
///
/// Encoding `None` produces the null sentinel, which the driver accepts in
/// place of a string. The allocation is released when the value is dropped
/// or passed to [`release_caller_owned`]; both consume it, so it cannot be
/// released twice.
#[derive(Debug)]
pub struct CallerString {
    ptr: *mut c_char,
}

impl CallerString {
    /// Pointer to hand to the driver. Valid until `self` is dropped.
    pub fn as_ptr(&self) -> *const c_char {
        self.ptr
    }

    /// Whether this is the null sentinel
    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }
}

impl Drop for CallerString {
    fn drop(&mut self) {
        if self.ptr.is_null() {
            return;
        }
        // Reconstruct the CString and let it drop
        unsafe {
            drop(CString::from_raw(self.ptr));
        }
        self.ptr = ptr::null_mut();
        OUTSTANDING_CALLER_BUFFERS.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Encode optional text as a caller-owned C string.
///
/// Fails only when the text holds an interior NUL, which a C string cannot
/// carry.
pub fn encode(text: Option<&str>) -> Result<CallerString> {
    encode_arg("text", text)
}

/// [`encode`], reporting failures against the named parameter
pub(crate) fn encode_arg(name: &'static str, text: Option<&str>) -> Result<CallerString> {
    let Some(text) = text else {
        return Ok(CallerString {
            ptr: ptr::null_mut(),
        });
    };

    let c_string = CString::new(text).map_err(|e| {
        Error::invalid_argument(
            name,
            format!("contains a NUL byte at offset {}", e.nul_position()),
        )
    })?;

    OUTSTANDING_CALLER_BUFFERS.fetch_add(1, Ordering::SeqCst);
    Ok(CallerString {
        ptr: c_string.into_raw(),
    })
}

/// Free a buffer produced by [`encode`]. Equivalent to dropping it.
pub fn release_caller_owned(buffer: CallerString) {
    drop(buffer);
}

/// Number of caller-owned buffers currently alive in this process.
///
/// Every binding call releases what it encoded before returning, so outside
/// of an in-flight call this is zero unless the user is holding buffers.
pub fn outstanding_caller_buffers() -> usize {
    OUTSTANDING_CALLER_BUFFERS.load(Ordering::SeqCst)
}

/// Decode a NUL-terminated string, or `None` for the null sentinel.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated buffer that stays valid
/// for the duration of the call.
pub unsafe fn decode(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

/// Decode a fixed-capacity output buffer up to its first NUL.
///
/// A buffer the driver filled completely, without a terminator, is decoded
/// in full; nothing past its end is read.
pub fn decode_fixed(buffer: &[u8]) -> String {
    let end = buffer.iter().position(|&b| b == 0).unwrap_or(buffer.len());
    String::from_utf8_lossy(&buffer[..end]).into_owned()
}

/// A string returned by the driver, released through `tdReleaseString` on
/// drop.
pub struct LibraryString<'a, L: NativeLibrary> {
    ptr: *mut c_char,
    lib: &'a L,
}

impl<'a, L: NativeLibrary> LibraryString<'a, L> {
    /// Take ownership of a string returned by `lib`.
    ///
    /// # Safety
    /// `ptr` must be null or a string returned by `lib` that nobody has
    /// released yet. Ownership moves into the returned value.
    pub unsafe fn from_raw(lib: &'a L, ptr: *mut c_char) -> Self {
        Self { ptr, lib }
    }

    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    /// Decode without giving up ownership
    pub fn to_string_lossy(&self) -> Option<String> {
        unsafe { decode(self.ptr) }
    }

    /// Decode, then release the native buffer
    pub fn into_string(self) -> Option<String> {
        self.to_string_lossy()
    }
}

impl<L: NativeLibrary> Drop for LibraryString<'_, L> {
    fn drop(&mut self) {
        if self.ptr.is_null() {
            return;
        }
        unsafe {
            self.lib.td_release_string(self.ptr);
        }
        self.ptr = ptr::null_mut();
    }
}

/// Hand a driver string back to the driver. Equivalent to dropping it.
pub fn release_library_owned<L: NativeLibrary>(buffer: LibraryString<'_, L>) {
    drop(buffer);
}
