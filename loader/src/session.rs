/*++

Licensed under the Apache-2.0 license.

File Name:

    session.rs

Abstract:

    File contains the boot session state shared by every partition load.

--*/

use secboot_drivers::DecKeyAvailability;
use secboot_image_types::BootHeaderSecureInfo;
use zeroize::Zeroize;

/// State that lives from cold boot until the boot image is handed off
///
/// The red key availability mask only ever gains flags.
pub struct BootSession {
    availability: DecKeyAvailability,
    boot_header: Option<BootHeaderSecureInfo>,
}

impl BootSession {
    pub fn new(boot_header: Option<BootHeaderSecureInfo>) -> Self {
        Self {
            availability: DecKeyAvailability::empty(),
            boot_header,
        }
    }

    pub fn availability(&self) -> DecKeyAvailability {
        self.availability
    }

    /// Record that the red key behind `flag` now sits in its slot
    pub fn mark_red_key_derived(&mut self, flag: DecKeyAvailability) {
        self.availability |= flag;
    }

    pub fn boot_header(&self) -> Option<&BootHeaderSecureInfo> {
        self.boot_header.as_ref()
    }
}

impl Drop for BootSession {
    fn drop(&mut self) {
        if let Some(boot_header) = self.boot_header.as_mut() {
            boot_header.zeroize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_availability_only_grows() {
        let mut session = BootSession::new(None);
        assert!(session.availability().is_empty());
        session.mark_red_key_derived(DecKeyAvailability::BH_RED);
        session.mark_red_key_derived(DecKeyAvailability::EFUSE_RED);
        session.mark_red_key_derived(DecKeyAvailability::BH_RED);
        assert_eq!(
            session.availability(),
            DecKeyAvailability::BH_RED | DecKeyAvailability::EFUSE_RED
        );
        assert!(session.boot_header().is_none());
    }
}
