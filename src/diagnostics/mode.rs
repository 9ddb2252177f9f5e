//! Dispatch mode: whether log calls are buffered or written straight to the terminal.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

/// How [`Diagnostics::dispatch`](super::Diagnostics::dispatch) routes a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Append to the in-memory buffer.
    Buffering,
    /// Write pending records and the new one to the terminal.
    DirectTerminal,
}

impl DispatchMode {
    fn to_u8(self) -> u8 {
        match self {
            DispatchMode::Buffering => 0,
            DispatchMode::DirectTerminal => 1,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => DispatchMode::DirectTerminal,
            _ => DispatchMode::Buffering,
        }
    }
}

/// Atomic holder for the current [`DispatchMode`].
///
/// The base mode is fixed at construction. [`enter_direct`](Self::enter_direct)
/// overrides it with [`DispatchMode::DirectTerminal`] for as long as any guard
/// is alive, so guards taken on different threads may overlap and drop in any
/// order.
#[derive(Debug)]
pub struct ModeCell {
    base: AtomicU8,
    direct_holders: AtomicUsize,
}

impl ModeCell {
    pub fn new(mode: DispatchMode) -> Self {
        Self {
            base: AtomicU8::new(mode.to_u8()),
            direct_holders: AtomicUsize::new(0),
        }
    }

    pub fn get(&self) -> DispatchMode {
        if self.direct_holders.load(Ordering::SeqCst) > 0 {
            DispatchMode::DirectTerminal
        } else {
            DispatchMode::from_u8(self.base.load(Ordering::SeqCst))
        }
    }

    /// Routes dispatches straight to the terminal until the returned guard is
    /// dropped.
    pub fn enter_direct(&self) -> ModeGuard<'_> {
        self.direct_holders.fetch_add(1, Ordering::SeqCst);
        ModeGuard { cell: self }
    }
}

/// Releases one DirectTerminal hold on drop.
#[must_use = "the mode reverts as soon as the guard is dropped"]
pub struct ModeGuard<'a> {
    cell: &'a ModeCell,
}

impl Drop for ModeGuard<'_> {
    fn drop(&mut self) {
        self.cell.direct_holders.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_restores_previous_mode() {
        let cell = ModeCell::new(DispatchMode::Buffering);
        {
            let _guard = cell.enter_direct();
            assert_eq!(cell.get(), DispatchMode::DirectTerminal);
        }
        assert_eq!(cell.get(), DispatchMode::Buffering);
    }

    #[test]
    fn test_overlapping_guards_release_in_any_order() {
        let cell = ModeCell::new(DispatchMode::Buffering);
        let first = cell.enter_direct();
        let second = cell.enter_direct();
        drop(first);
        assert_eq!(cell.get(), DispatchMode::DirectTerminal);
        drop(second);
        assert_eq!(cell.get(), DispatchMode::Buffering);
    }

    #[test]
    fn test_guards_across_threads_settle_back_to_base() {
        let cell = ModeCell::new(DispatchMode::Buffering);
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        let _guard = cell.enter_direct();
                        assert_eq!(cell.get(), DispatchMode::DirectTerminal);
                    }
                });
            }
        });
        assert_eq!(cell.get(), DispatchMode::Buffering);
    }

    #[test]
    fn test_direct_base_ignores_guards() {
        let cell = ModeCell::new(DispatchMode::DirectTerminal);
        drop(cell.enter_direct());
        assert_eq!(cell.get(), DispatchMode::DirectTerminal);
    }
}
