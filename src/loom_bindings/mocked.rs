pub(crate) mod cell {
    pub(crate) use loom::cell::UnsafeCell;
}

pub(crate) mod hint {
    pub(crate) use loom::hint::spin_loop;
}

pub(crate) mod sync {
    pub(crate) mod atomic {
        pub(crate) use loom::sync::atomic::AtomicI64;
    }
}

pub(crate) mod thread {
    pub(crate) use loom::thread::yield_now;
}
