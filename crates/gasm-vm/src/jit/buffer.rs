//! Executable code ownership, the re-architected form of spec §9's
//! "executable memory ownership" note: a `CodeBuffer` owns the `mmap`'d
//! pages it compiled code into, releases them on `Drop`, and never lets a
//! raw function pointer escape past its own lifetime. Modeled on
//! `ExecutableCode` in the teacher's `jit/backend/traits.rs` (there, GC
//! stack maps and relocations accompany the pointer; here there are none,
//! so the type is just the pointer, its size, and the `Drop` glue).

use crate::error::VmError;

/// The native function signature emitted by the JIT, spec §4.4:
/// `fn(inputs, inputLen, registers, registerLen, cng, rng, maxProcessTime) -> u64`.
pub type CompiledFn = unsafe extern "C" fn(*mut f64, u64, *mut f64, u64, *const (), *const (), u64) -> u64;

/// Owns one `mmap`'d, executable page range holding a single compiled
/// program. Never `Clone`: the pages are released exactly once, when this
/// value drops.
pub struct CodeBuffer {
    ptr: *mut u8,
    len: usize,
}

// Safety: `ptr` addresses immutable, executable memory once construction
// finishes; no interior mutability is exposed through `CodeBuffer`.
unsafe impl Send for CodeBuffer {}
unsafe impl Sync for CodeBuffer {}

impl CodeBuffer {
    /// Copies `code` into freshly mapped pages and marks them executable.
    #[cfg(unix)]
    pub fn allocate(code: &[u8]) -> Result<CodeBuffer, VmError> {
        if code.is_empty() {
            return Err(VmError::InvalidArgument("JIT produced no code".into()));
        }
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
        let len = code.len().div_ceil(page_size) * page_size;

        // SAFETY: a fresh anonymous private mapping; no aliasing concerns.
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(VmError::InvalidArgument("mmap failed while allocating JIT code pages".into()));
        }
        let ptr = ptr as *mut u8;

        // SAFETY: `ptr` is writable for `len` bytes (just mapped above) and
        // `code.len() <= len`.
        unsafe {
            std::ptr::copy_nonoverlapping(code.as_ptr(), ptr, code.len());
        }

        // SAFETY: `ptr`/`len` describe exactly the mapping created above.
        let rc = unsafe { libc::mprotect(ptr as *mut libc::c_void, len, libc::PROT_READ | libc::PROT_EXEC) };
        if rc != 0 {
            unsafe {
                libc::munmap(ptr as *mut libc::c_void, len);
            }
            return Err(VmError::InvalidArgument("mprotect failed while finalizing JIT code pages".into()));
        }

        Ok(CodeBuffer { ptr, len })
    }

    #[cfg(not(unix))]
    pub fn allocate(_code: &[u8]) -> Result<CodeBuffer, VmError> {
        Err(VmError::UnsupportedArchitecture)
    }

    /// Returns the entry point as a typed function pointer. The returned
    /// pointer must not be called after `self` drops.
    pub fn entry_point(&self) -> CompiledFn {
        // SAFETY: `self.ptr` was mapped PROT_READ|PROT_EXEC by `allocate`
        // and holds exactly the bytes the JIT emitted for this signature.
        unsafe { std::mem::transmute::<*mut u8, CompiledFn>(self.ptr) }
    }
}

#[cfg(unix)]
impl Drop for CodeBuffer {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr as *mut libc::c_void, self.len);
        }
    }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;

    #[test]
    fn allocate_rejects_empty_code() {
        assert!(CodeBuffer::allocate(&[]).is_err());
    }

    #[test]
    fn allocate_copies_and_maps_executable() {
        // `xor eax, eax; ret` — a trivial, deterministic x86-64 function body.
        let buffer = CodeBuffer::allocate(&[0x31, 0xC0, 0xC3]).unwrap();
        let entry = buffer.entry_point();
        let result = unsafe { entry(std::ptr::null_mut(), 0, std::ptr::null_mut(), 0, std::ptr::null(), std::ptr::null(), 0) };
        assert_eq!(result, 0);
    }
}
