//! Thread creation attributes, their defaults, and validators.

/// Affinity flag: runnable on core 0.
pub const AFFINITY_CPU0: u8 = 1 << 0;
/// Affinity flag: runnable on core 1, the "main" core.
pub const AFFINITY_CPU1: u8 = 1 << 1;
/// Affinity flag: runnable on core 2.
pub const AFFINITY_CPU2: u8 = 1 << 2;
/// Affinity flag: runnable on any core.
pub const AFFINITY_ANY: u8 = AFFINITY_CPU0 | AFFINITY_CPU1 | AFFINITY_CPU2;

/// Highest schedulable priority.
pub const PRIORITY_HIGHEST: u8 = 0;
/// Lowest schedulable priority.
pub const PRIORITY_LOWEST: u8 = 31;

/// Thread creation attributes: an 8-bit affinity mask, an 8-bit priority
/// (0 = highest, 31 = lowest) and the requested stack size in bytes.
///
/// A snapshot of these is kept in the thread's footer so they stay
/// inspectable after creation.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadAttributes {
    pub flags: u8,
    pub priority: u8,
    pub stack_size: u32,
}

/// Fallback values substituted for omitted creation attributes.
///
/// Injected into [`crate::thread::ThreadManager`] at construction rather
/// than read from compile-time constants, so alternate defaults can be
/// supplied in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadDefaults {
    pub flags: u8,
    pub priority: u8,
    pub stack_size: u32,
}

impl ThreadDefaults {
    /// Stock platform defaults: main-core affinity, mid priority, 128 KiB
    /// stack.
    pub const STOCK: Self = Self {
        flags: AFFINITY_CPU1,
        priority: 15,
        stack_size: 128 * 1024,
    };

    /// Substitute these defaults when `attributes` is omitted.
    #[must_use]
    pub const fn resolve(self, attributes: Option<ThreadAttributes>) -> ThreadAttributes {
        match attributes {
            Some(attributes) => attributes,
            None => ThreadAttributes {
                flags: self.flags,
                priority: self.priority,
                stack_size: self.stack_size,
            },
        }
    }

    /// Attributes pinned to `core_id`, defaulting everything else.
    /// An out-of-range core id keeps the default affinity.
    #[must_use]
    pub const fn pinned_to_core(self, core_id: u32) -> ThreadAttributes {
        ThreadAttributes {
            flags: match affinity_for_core(core_id) {
                Some(flags) => flags,
                None => self.flags,
            },
            priority: self.priority,
            stack_size: self.stack_size,
        }
    }

    /// Attributes built from explicit fields; a zero stack size, an
    /// out-of-range core id or an out-of-range priority each fall back to
    /// the corresponding default.
    #[must_use]
    pub const fn customized(self, stack_size: u32, core_id: u32, priority: u32) -> ThreadAttributes {
        ThreadAttributes {
            flags: match affinity_for_core(core_id) {
                Some(flags) => flags,
                None => self.flags,
            },
            priority: if valid_priority(priority) {
                priority as u8
            } else {
                self.priority
            },
            stack_size: if stack_size != 0 {
                stack_size
            } else {
                self.stack_size
            },
        }
    }
}

impl Default for ThreadDefaults {
    fn default() -> Self {
        Self::STOCK
    }
}

/// Affinity mask for a single core id, if it names one of the three cores.
#[must_use]
pub const fn affinity_for_core(core_id: u32) -> Option<u8> {
    if core_id <= 2 {
        Some(1u8 << core_id)
    } else {
        None
    }
}

/// Returns true for a schedulable priority value.
#[must_use]
pub const fn valid_priority(priority: u32) -> bool {
    priority <= PRIORITY_LOWEST as u32
}
