use callrec_template::{CallDirection, CallMetadata, PhoneNumber};
use chrono::{FixedOffset, TimeZone};
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Generate n random calls to use in the benchmark
pub fn generate_random_calls(n: usize) -> Vec<CallMetadata> {
    let mut rng = StdRng::seed_from_u64(42); // Fixed seed for reproducibility
    let mut calls = Vec::with_capacity(n);

    for _ in 0..n {
        let offset = FixedOffset::east_opt(rng.random_range(-12..=12) * 3600).unwrap();
        let timestamp = offset
            .timestamp_opt(rng.random_range(1_500_000_000..1_800_000_000), 0)
            .unwrap();

        let direction = match rng.random_range(0..4) {
            0 => Some(CallDirection::In),
            1 => Some(CallDirection::Out),
            2 => Some(CallDirection::Conference),
            _ => None,
        };

        calls.push(CallMetadata {
            direction,
            sim_slot: rng.random_bool(0.5).then(|| rng.random_range(1..=2)),
            phone_number: rng
                .random_bool(0.8)
                .then(|| PhoneNumber::new(format!("+1555{:07}", rng.random_range(0..10_000_000)))),
            contact_name: rng.random_bool(0.4).then(|| random_string(&mut rng, 3, 12)),
            caller_name: rng.random_bool(0.3).then(|| random_string(&mut rng, 3, 12)),
            call_log_name: rng.random_bool(0.2).then(|| random_string(&mut rng, 3, 12)),
            ..CallMetadata::new(timestamp)
        });
    }

    calls
}

/// Generate a random string with length between min and max
fn random_string(rng: &mut StdRng, min_len: usize, max_len: usize) -> String {
    let charset = "abcdefghijklmnopqrstuvwxyz";
    let len = rng.random_range(min_len..=max_len);

    (0..len)
        .map(|_| {
            let idx = rng.random_range(0..charset.len());
            charset.chars().nth(idx).unwrap()
        })
        .collect()
}
