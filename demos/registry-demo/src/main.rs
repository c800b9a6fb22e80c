//! Registry Demo
//!
//! Shows:
//! 1. Registrar commits a batch of certificates as one Merkle root
//! 2. Graduate presents a certificate with its inclusion proof
//! 3. Forged certificate is rejected
//! 4. Registrar revokes the batch and the same proof stops verifying

use anyhow::{Context, Result};
use merkle::{encode_hash, Hash32, Hasher, MerkleTree};
use registry::{
    Action, CallerId, InMemoryStatusStore, JournalStatusStore, OwnerOnly, RegistryConfig, RegistryService,
    RegistryState, StatusStore,
};
use tracing::{info, warn};

const REGISTRAR: &str = "registrar";

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = match RegistryConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(error = %e, "falling back to demo configuration");
            RegistryConfig::new("Demo Institute", "https://verify.demo.example")?
        }
    };
    let policy = OwnerOnly::new(REGISTRAR);

    match std::env::var("REGISTRY_JOURNAL") {
        Ok(path) => {
            let store = JournalStatusStore::open(&path)
                .with_context(|| format!("Failed to open journal at {path}"))?;
            info!(path = %store.path().display(), records = store.record_count(), "using journal store");
            run(RegistryService::new(cfg, RegistryState::with_store(store), policy))
        }
        Err(_) => run(RegistryService::new(
            cfg,
            RegistryState::with_store(InMemoryStatusStore::new()),
            policy,
        )),
    }
}

fn run<S: StatusStore>(svc: RegistryService<S>) -> Result<()> {
    println!("=== {} ===", svc.name());
    println!("Verify at: {}\n", svc.verification_url());

    // 1. Batch commitment
    println!("--- Issue batch ---");
    let certificates: Vec<String> = (0..6)
        .map(|i| format!("{{\"student\":\"S-{i:04}\",\"degree\":\"BSc\",\"year\":2026}}"))
        .collect();
    let hasher = *svc.hasher();
    let leaves: Vec<Hash32> = certificates.iter().map(|c| hasher.hash(c.as_bytes())).collect();
    let tree = MerkleTree::new(hasher, &leaves)?;
    let root = tree.root();

    let registrar = CallerId::new(REGISTRAR);
    let permit = svc.authorize(&registrar, Action::Issue)?;
    let transition = svc.issue(&permit, root)?;
    println!("Root:   {}", encode_hash(&root));
    println!("Status: {} -> {}", transition.previous, transition.current);

    // 2. Presentation
    println!("\n--- Present certificate #4 ---");
    let proof = tree.proof(4)?;
    println!("Leaf:  {}", encode_hash(&leaves[4]));
    println!("Proof: {} step(s)", proof.len());
    for step in &proof.steps {
        println!("  {:?} {}", step.side, encode_hash(&step.sibling));
    }
    let ok = svc.check_proof(root, leaves[4], &proof);
    println!("Valid: {ok}");

    // 3. Forgery
    println!("\n--- Forged certificate ---");
    let forged = hasher.hash(certificates[4].replace("BSc", "PhD").as_bytes());
    println!("Assessment: {:?}", svc.assess(root, forged, &proof));

    // 4. Revocation
    println!("\n--- Revoke batch ---");
    if let Err(e) = svc.authorize(&CallerId::new("student"), Action::Invalidate) {
        println!("Student attempt: {e}");
    }
    let permit = svc.authorize(&registrar, Action::Invalidate)?;
    svc.invalidate(&permit, root)?;
    println!("Assessment after revocation: {:?}", svc.assess(root, leaves[4], &proof));

    let permit = svc.authorize(&registrar, Action::Issue)?;
    let reissue = svc.issue(&permit, root)?;
    println!("Re-issue changed status: {}", reissue.changed());

    Ok(())
}
