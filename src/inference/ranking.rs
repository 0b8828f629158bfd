use super::broker::ServiceCandidate;

/// Verifiability mode of providers running inside a trusted execution
/// environment
pub const TEE_VERIFIABILITY: &str = "TeeML";

/// Default allow-list of official providers
pub const OFFICIAL_PROVIDERS: &[&str] = &[
    "0xf07240Efa67755B5311bc75784a061eDB47165Dd",
    "0x3feE5a4dd5FDb8a32dDA97Bed899830605dBD9D3",
];

fn tier(candidate: &ServiceCandidate, official: &[String]) -> u8 {
    let is_official = official
        .iter()
        .any(|address| address.eq_ignore_ascii_case(&candidate.provider_address));
    let is_tee = candidate.verifiability.as_deref() == Some(TEE_VERIFIABILITY);

    if is_official && is_tee {
        0
    } else if candidate.is_verifiable() {
        1
    } else {
        2
    }
}

/// Order candidates in three tiers: official TEE providers, other verifiable
/// providers, everything else. Discovery order is kept within a tier.
pub fn rank_candidates(mut candidates: Vec<ServiceCandidate>, official: &[String]) -> Vec<ServiceCandidate> {
    candidates.sort_by_key(|candidate| tier(candidate, official));
    candidates
}
