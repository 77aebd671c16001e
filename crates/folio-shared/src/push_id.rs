//! Time-ordered collection keys.
//!
//! A push key is 8 characters of millisecond timestamp followed by 12 random
//! characters, all drawn from an alphabet whose byte order matches its index
//! order. Keys generated later always sort after keys generated earlier, so
//! iterating a collection by key yields creation order.

use std::sync::Mutex;

use chrono::Utc;
use rand::Rng;

use crate::constants::PUSH_KEY_LEN;

const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

const TIME_CHARS: usize = 8;
const RANDOM_CHARS: usize = PUSH_KEY_LEN - TIME_CHARS;

#[derive(Debug, Default)]
struct PushState {
    last_millis: i64,
    last_random: [u8; RANDOM_CHARS],
}

/// Generates strictly increasing push keys.
#[derive(Debug, Default)]
pub struct PushIdGenerator {
    state: Mutex<PushState>,
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> String {
        self.next_id_at(Utc::now().timestamp_millis())
    }

    /// Generate a key for an explicit timestamp.
    pub fn next_id_at(&self, millis: i64) -> String {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if millis <= state.last_millis {
            // Same (or skewed) millisecond: bump the random tail instead of
            // rerolling it so the new key still sorts after the previous one.
            let millis = state.last_millis;
            increment(&mut state.last_random);
            return encode(millis, &state.last_random);
        }

        let mut rng = rand::thread_rng();
        for slot in state.last_random.iter_mut() {
            *slot = rng.gen_range(0..64);
        }
        state.last_millis = millis;
        encode(millis, &state.last_random)
    }
}

fn increment(random: &mut [u8; RANDOM_CHARS]) {
    for slot in random.iter_mut().rev() {
        if *slot < 63 {
            *slot += 1;
            return;
        }
        *slot = 0;
    }
}

fn encode(millis: i64, random: &[u8; RANDOM_CHARS]) -> String {
    let mut time_part = [0u8; TIME_CHARS];
    let mut now = millis.max(0) as u64;
    for slot in time_part.iter_mut().rev() {
        *slot = PUSH_CHARS[(now % 64) as usize];
        now /= 64;
    }

    let mut key = String::with_capacity(PUSH_KEY_LEN);
    key.extend(time_part.iter().map(|&b| b as char));
    key.extend(random.iter().map(|&i| PUSH_CHARS[i as usize] as char));
    key
}
