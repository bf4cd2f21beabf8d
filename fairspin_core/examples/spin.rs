use fairspin_core::{generate_seed, spin_once, verify_reels};

fn main() {
    // Example end-to-end spin and its public verification
    let seed = generate_seed();
    let outcome = spin_once(seed, 0.1);
    println!(
        "seed_hash={} reels={} multiplier={} payout={}",
        outcome.seed_hash, outcome.reels, outcome.result.multiplier, outcome.payout
    );
    println!("revealed seed={}", outcome.server_seed);
    let valid = verify_reels(&outcome.server_seed, &outcome.seed_hash, &outcome.reels);
    println!("verified={valid}");
}
