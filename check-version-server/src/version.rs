/// Whether `client` is at least as new as `latest`.
///
/// Versions are `major.minor.patch` with an optional leading `v`. Each
/// component is read as a decimal number, so `-1` and `1e1` compare as -1 and
/// 10. Missing components count as 0, as does any component that is not a
/// finite number, and anything past the third component is ignored.
#[must_use]
pub fn is_version_latest(client: &str, latest: &str) -> bool {
    components(client) >= components(latest)
}

fn components(version: &str) -> [f64; 3] {
    let version = version.strip_prefix('v').unwrap_or(version);
    let mut out = [0.0; 3];
    for (slot, part) in out.iter_mut().zip(version.split('.')) {
        *slot = part
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .unwrap_or(0.0);
    }
    out
}
