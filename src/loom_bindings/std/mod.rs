mod unsafe_cell;

pub(crate) mod cell {
    pub(crate) use super::unsafe_cell::UnsafeCell;
}

pub(crate) mod hint {
    pub(crate) use std::hint::spin_loop;
}

pub(crate) mod sync {
    pub(crate) mod atomic {
        pub(crate) use std::sync::atomic::AtomicI64;
    }
}

pub(crate) mod thread {
    #[inline]
    pub(crate) fn yield_now() {
        std::thread::yield_now();
    }
}
