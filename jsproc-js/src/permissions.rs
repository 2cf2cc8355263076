//! Access permissions handed to the engine sandbox

use bitflags::bitflags;

bitflags! {
    /// Media access scope granted to a process
    ///
    /// The flags are opaque to the lifecycle manager; the engine exposes them
    /// to scripts as `process.permissions`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessPermissions: u32 {
        const READ = 0b0001;
        const WRITE = 0b0010;
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
    }
}

impl Default for AccessPermissions {
    fn default() -> Self {
        AccessPermissions::READ_WRITE
    }
}

impl AccessPermissions {
    pub fn can_read(&self) -> bool {
        self.contains(AccessPermissions::READ)
    }

    pub fn can_write(&self) -> bool {
        self.contains(AccessPermissions::WRITE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        assert!(AccessPermissions::READ_WRITE.can_read());
        assert!(AccessPermissions::READ_WRITE.can_write());
        assert!(!AccessPermissions::READ.can_write());
        assert!(!AccessPermissions::empty().can_read());
        assert_eq!(AccessPermissions::default(), AccessPermissions::READ_WRITE);
    }
}
