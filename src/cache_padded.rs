//! Provides [`CachePaddedAtomicI64`], the counter cell that keeps each queue counter
//! on its own cache line.
use crate::loom_bindings::sync::atomic::AtomicI64;
use std::mem::MaybeUninit;
use std::ops::Deref;

// Adjacent-line prefetchers pull cache lines in pairs on these targets,
// so a counter has to own 128 bytes to stay alone.
#[cfg(any(
    target_arch = "x86_64",
    target_arch = "aarch64",
    target_arch = "arm64ec",
    target_arch = "powerpc64",
))]
const ALIGN: usize = 128;

#[cfg(any(
    target_arch = "arm",
    target_arch = "mips",
    target_arch = "mips32r6",
    target_arch = "mips64",
    target_arch = "mips64r6",
    target_arch = "sparc",
    target_arch = "hexagon",
))]
const ALIGN: usize = 32;

#[cfg(target_arch = "s390x")]
const ALIGN: usize = 256;

#[cfg(not(any(
    target_arch = "x86_64",
    target_arch = "aarch64",
    target_arch = "arm64ec",
    target_arch = "powerpc64",
    target_arch = "arm",
    target_arch = "mips",
    target_arch = "mips32r6",
    target_arch = "mips64",
    target_arch = "mips64r6",
    target_arch = "sparc",
    target_arch = "hexagon",
    target_arch = "s390x",
)))]
const ALIGN: usize = 64;

const PADDING: usize = if size_of::<AtomicI64>() > ALIGN {
    0
} else {
    ALIGN - size_of::<AtomicI64>()
};

/// An [`AtomicI64`] followed by enough padding that two of them placed next to each
/// other never share a cache line. Dereferences to the inner atomic.
#[repr(C)]
pub struct CachePaddedAtomicI64 {
    atomic: AtomicI64,
    _pad: MaybeUninit<[u8; PADDING]>,
}

impl CachePaddedAtomicI64 {
    /// Creates a new padded atomic holding zero.
    pub fn new() -> Self {
        Self {
            atomic: AtomicI64::new(0),
            _pad: MaybeUninit::uninit(),
        }
    }
}

impl Deref for CachePaddedAtomicI64 {
    type Target = AtomicI64;

    #[inline(always)]
    fn deref(&self) -> &Self::Target {
        &self.atomic
    }
}

impl Default for CachePaddedAtomicI64 {
    fn default() -> Self {
        Self::new()
    }
}
