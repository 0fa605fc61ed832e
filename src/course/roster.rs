//! Roster parsing
//!
//! One student per line, `<control number> <full name>`. Each parsed student
//! receives a random 4-digit PIN used to sign in to the classroom bundle.
use rand::Rng;

use super::types::AuthorizedStudent;

pub fn parse_student_list(raw: &str) -> Vec<AuthorizedStudent> {
    let mut rng = rand::thread_rng();
    raw.lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let id = parts.next()?;
            let name = parts.collect::<Vec<_>>().join(" ");
            if name.is_empty() {
                return None;
            }
            Some(AuthorizedStudent {
                id: id.to_string(),
                name,
                pin: generate_pin(&mut rng),
            })
        })
        .collect()
}

pub fn generate_pin(rng: &mut impl Rng) -> String {
    rng.gen_range(1000..=9999).to_string()
}
