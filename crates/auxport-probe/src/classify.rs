use auxport_kbdc::AuxTestResponse;
use auxport_pc_constants::{resp, DEFAULT_TOLERATED_AUX_TEST_CODES};

/// Conclusion of a probe: is something answering on the aux channel?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuxPortStatus {
    Present,
    Absent,
}

/// Result codes accepted as "port present" besides the no-error code.
///
/// Some controllers return a line-stuck error or a stray device ACK for a
/// perfectly functional port. Which of those codes are still worth tolerating
/// on current hardware is unsettled, so the set is data rather than logic;
/// the default reproduces the list that shipped in production for years.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxTestPolicy {
    tolerated: Vec<u8>,
}

impl AuxTestPolicy {
    pub fn new(tolerated: impl Into<Vec<u8>>) -> Self {
        Self {
            tolerated: tolerated.into(),
        }
    }

    /// Accepts only the no-error code.
    pub fn strict() -> Self {
        Self::new([])
    }

    pub fn tolerates(&self, code: u8) -> bool {
        self.tolerated.contains(&code)
    }
}

impl Default for AuxTestPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERATED_AUX_TEST_CODES)
    }
}

/// Maps a raw aux-test outcome to a port status.
///
/// Pure function: the no-error code and every tolerated code classify as
/// present; a timeout or any other code classifies as absent. The bias is
/// deliberate — a false "absent" loses a working device, while a false
/// "present" is caught when the device itself fails to respond during attach.
pub fn classify(policy: &AuxTestPolicy, response: AuxTestResponse) -> AuxPortStatus {
    match response {
        AuxTestResponse::Code(resp::AUX_TEST_OK) => AuxPortStatus::Present,
        AuxTestResponse::Code(code) if policy.tolerates(code) => AuxPortStatus::Present,
        AuxTestResponse::Code(_) | AuxTestResponse::Timeout => AuxPortStatus::Absent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_error_code_is_present() {
        let policy = AuxTestPolicy::default();
        assert_eq!(
            classify(&policy, AuxTestResponse::Code(0x00)),
            AuxPortStatus::Present
        );
    }

    #[test]
    fn default_policy_tolerates_the_known_bogus_codes() {
        let policy = AuxTestPolicy::default();
        for code in [0x01, 0x02, 0x03, 0xFA] {
            assert_eq!(
                classify(&policy, AuxTestResponse::Code(code)),
                AuxPortStatus::Present,
                "code {code:#04x}"
            );
        }
    }

    #[test]
    fn timeout_and_unknown_codes_are_absent() {
        let policy = AuxTestPolicy::default();
        assert_eq!(
            classify(&policy, AuxTestResponse::Timeout),
            AuxPortStatus::Absent
        );
        // Data-line-stuck-high was never on the tolerated list.
        assert_eq!(
            classify(&policy, AuxTestResponse::Code(0x04)),
            AuxPortStatus::Absent
        );
        assert_eq!(
            classify(&policy, AuxTestResponse::Code(0xFE)),
            AuxPortStatus::Absent
        );
    }

    #[test]
    fn strict_policy_rejects_everything_but_zero() {
        let policy = AuxTestPolicy::strict();
        assert_eq!(
            classify(&policy, AuxTestResponse::Code(0x00)),
            AuxPortStatus::Present
        );
        assert_eq!(
            classify(&policy, AuxTestResponse::Code(0x01)),
            AuxPortStatus::Absent
        );
    }
}
