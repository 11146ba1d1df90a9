use arbitrary::{Arbitrary, Unstructured};
use asset_redemption::error::RedemptionError;
use fuzz_helpers::*;
use honggfuzz::fuzz;
use solana_sdk::pubkey::Pubkey;

/// Fuzzable input: which accounts to forge when resolving a pending redemption
#[derive(Debug, Clone, Arbitrary)]
struct SpoofFuzzInput {
    burn: bool,
    spoof_customer_token_account: bool,
    spoof_payment_account: bool,
    spoof_custody_vault: bool,
    /// Raw bytes for a forged token account; a real stranger account when absent
    token_account: Option<[u8; 32]>,
    /// Raw bytes for the forged payment account
    payment_account: [u8; 32],
    /// Raw bytes for the forged vault
    custody_vault: [u8; 32],
}

async fn fuzz_spoof_once(input: SpoofFuzzInput) -> FuzzResult<()> {
    let (mut env, setup) = setup_complete_environment(1).await?;
    let stranger = setup_customer(&mut env.context, &setup.asset.mint).await?;

    let ix = initialize_redemption_ix(&env.program_id, &setup.ix_accounts());
    send_instruction(&mut env.context, ix, &[&setup.customer.owner]).await?;

    let genuine = setup.ix_accounts();
    let mut accounts = genuine;
    if input.spoof_customer_token_account {
        accounts.customer_token_account = input
            .token_account
            .map(Pubkey::new_from_array)
            .unwrap_or(stranger.token_account);
    }
    if input.spoof_payment_account {
        accounts.customer_payment_account = Pubkey::new_from_array(input.payment_account);
    }
    if input.spoof_custody_vault {
        accounts.custody_vault = Pubkey::new_from_array(input.custody_vault);
    }

    // The runtime refuses to write-lock these, so the transaction fails its
    // writable-account checks before the handler sees the forgery
    let read_only = [
        solana_sdk::system_program::ID,
        env.program_id,
        spl_token::id(),
    ];
    let writable = [
        accounts.customer_token_account,
        accounts.customer_payment_account,
        accounts.custody_vault,
    ];
    if writable.iter().any(|address| read_only.contains(address)) {
        return Ok(());
    }

    let forged = accounts.customer_token_account != genuine.customer_token_account
        || accounts.customer_payment_account != genuine.customer_payment_account
        || accounts.custody_vault != genuine.custody_vault;
    if !forged {
        return Ok(()); // Nothing was spoofed, the honest path is covered elsewhere
    }

    let before = snapshot(&mut env.context, &setup).await?;

    let ix = if input.burn {
        burn_asset_token_ix(&env.program_id, &accounts)
    } else {
        return_asset_token_ix(&env.program_id, &accounts)
    };

    match send_instruction(&mut env.context, ix, &[]).await {
        Ok(()) => panic!(
            "SECURITY: forged accounts resolved a redemption! Input: {:?}",
            input
        ),
        Err(e) => assert_eq!(
            custom_error_code(&e),
            Some(u32::from(RedemptionError::AuthorizationMismatch)),
            "Forged accounts rejected with an unexpected error: {:?}",
            e
        ),
    }

    let after = snapshot(&mut env.context, &setup).await?;
    assert_eq!(before, after, "Rejected resolution changed ledger state");

    Ok(())
}

fn main() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime");

    loop {
        fuzz!(|data: &[u8]| {
            let mut unstructured = Unstructured::new(data);
            let Ok(input) = SpoofFuzzInput::arbitrary(&mut unstructured) else {
                return;
            };
            if let Err(e) = runtime.block_on(fuzz_spoof_once(input)) {
                eprintln!("Fuzz iteration failed: {}", e);
            }
        });
    }
}
