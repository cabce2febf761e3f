//! Wallet Generation Utility
//!
//! Run with: cargo run --bin generate-wallet
//!
//! Generates a fresh keypair formatted for the `PRIVATE_KEY_*` convention
//! the runner loads from `.env`.

use alloy_signer_local::PrivateKeySigner;

fn main() {
    println!();
    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║          R2 RUNNER WALLET GENERATOR                        ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();

    // Generate a new random wallet
    let signer = PrivateKeySigner::random();
    let address = signer.address();

    // Get private key bytes
    let key_bytes = signer.credential().to_bytes();
    let private_key = format!("0x{}", hex::encode(key_bytes));

    println!("NEW WALLET GENERATED");
    println!();
    println!("   Address:     {:?}", address);
    println!("   Private Key: {}", private_key);
    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!("SECURITY WARNINGS:");
    println!();
    println!("   1. NEVER share your private key with anyone");
    println!("   2. NEVER commit it to git or any public repository");
    println!("   3. Store it securely (password manager, encrypted file)");
    println!("   4. Fund it with testnet tokens only");
    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!("TO USE THIS WALLET (add to .env):");
    println!();
    println!("   PRIVATE_KEY_1={}", private_key);
    println!();
    println!("   Additional wallets go in PRIVATE_KEY_2, PRIVATE_KEY_3, ...");
    println!("   The runner processes them in variable-name order.");
    println!();
}
