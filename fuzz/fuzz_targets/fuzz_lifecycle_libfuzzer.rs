#![no_main]

use arbitrary::Arbitrary;
use fuzz_helpers::model::{ModelState, RedemptionModel, Resolution};
use fuzz_helpers::*;
use libfuzzer_sys::fuzz_target;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signer;

/// Longest operation sequence replayed per iteration
const MAX_OPS: usize = 8;

/// Which account a resolution call lies about
#[derive(Debug, Clone, Copy, Arbitrary)]
enum Spoof {
    Nothing,
    CustomerTokenAccount,
    MissingTokenAccount,
    PaymentAccount,
    MintAsPayment,
    CustodyVault,
}

#[derive(Debug, Clone, Copy, Arbitrary)]
enum LifecycleOp {
    Initiate,
    Return(Spoof),
    Burn(Spoof),
}

/// Fuzzable input: a sequence of redemption operations against one mint
#[derive(Debug, Clone, Arbitrary)]
struct LifecycleFuzzInput {
    ops: Vec<LifecycleOp>,
}

/// Execute a single fuzz iteration, checking every step against the model
async fn fuzz_lifecycle_once(input: LifecycleFuzzInput) -> FuzzResult<()> {
    let (mut env, setup) = match setup_complete_environment(1).await {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Setup failed: {}", e);
            return Ok(()); // Skip this iteration if setup fails
        }
    };

    // A second holder of the same mint, used to spoof the customer token account
    let stranger = setup_customer(&mut env.context, &setup.asset.mint).await?;

    let mut model = RedemptionModel::new();
    model.register_asset(
        setup.asset.mint,
        setup.asset.decimals,
        &[(setup.customer.token_account, 1), (stranger.token_account, 0)],
    );

    let genuine = setup.ix_accounts();
    let customer = setup.customer.owner.pubkey();

    for op in input.ops.into_iter().take(MAX_OPS) {
        let before = snapshot(&mut env.context, &setup).await?;

        let (expected, result) = match op {
            LifecycleOp::Initiate => {
                let expected = model.initiate(&setup.asset.mint, genuine.customer_token_account, customer);
                let ix = initialize_redemption_ix(&env.program_id, &genuine);
                let result = send_instruction(&mut env.context, ix, &[&setup.customer.owner]).await;
                (expected, result)
            }
            LifecycleOp::Return(spoof) => {
                let (accounts, resolution) = spoofed(&genuine, spoof, &stranger.token_account);
                let expected = model.return_asset(&setup.asset.mint, &resolution);
                let ix = return_asset_token_ix(&env.program_id, &accounts);
                (expected, send_instruction(&mut env.context, ix, &[]).await)
            }
            LifecycleOp::Burn(spoof) => {
                let (accounts, resolution) = spoofed(&genuine, spoof, &stranger.token_account);
                let expected = model.burn(&setup.asset.mint, &resolution);
                let ix = burn_asset_token_ix(&env.program_id, &accounts);
                (expected, send_instruction(&mut env.context, ix, &[]).await)
            }
        };

        match (&expected, &result) {
            (Ok(()), Ok(())) => {}
            (Err(want), Err(got)) => {
                assert_eq!(
                    custom_error_code(got),
                    Some(u32::from(*want)),
                    "{:?} failed with the wrong error: expected {:?}, got {:?}",
                    op,
                    want,
                    got
                );
                // A rejected transaction must leave no trace
                let after = snapshot(&mut env.context, &setup).await?;
                assert_eq!(before, after, "{:?} was rejected but changed state", op);
            }
            _ => panic!(
                "Program and model disagree on {:?}: model={:?}, program={:?}",
                op, expected, result
            ),
        }

        // ========================================
        // INVARIANT CHECKS
        // ========================================
        let after = snapshot(&mut env.context, &setup).await?;
        let ledger = model.asset(&setup.asset.mint).ok_or("mint missing from model")?;

        assert_eq!(after.supply, ledger.supply, "Supply diverged from model after {:?}", op);
        assert_eq!(
            after.customer_balance,
            ledger.balance_of(&setup.customer.token_account),
            "Customer balance diverged from model after {:?}",
            op
        );
        assert_eq!(after.vault_balance, ledger.vault_balance, "Vault diverged after {:?}", op);

        // Record and vault live and die together
        let pending = matches!(ledger.state, ModelState::Pending { .. });
        assert_eq!(after.record_exists, pending, "Record existence diverged after {:?}", op);
        assert_eq!(after.vault_balance.is_some(), after.record_exists);

        // The unit is conserved until it is burned
        let held = after.customer_balance + after.vault_balance.unwrap_or(0);
        assert_eq!(held, after.supply, "Asset unit created or lost after {:?}", op);
    }

    println!("✓ PASS - lifecycle replayed against model, all invariants ✓");

    Ok(())
}

fn spoofed(
    genuine: &RedemptionIxAccounts,
    spoof: Spoof,
    stranger_token_account: &Pubkey,
) -> (RedemptionIxAccounts, Resolution) {
    let mut accounts = *genuine;
    match spoof {
        Spoof::Nothing => {}
        Spoof::CustomerTokenAccount => accounts.customer_token_account = *stranger_token_account,
        Spoof::MissingTokenAccount => accounts.customer_token_account = Pubkey::new_unique(),
        Spoof::PaymentAccount => accounts.customer_payment_account = Pubkey::new_unique(),
        Spoof::MintAsPayment => accounts.customer_payment_account = genuine.asset_mint,
        Spoof::CustodyVault => accounts.custody_vault = Pubkey::new_unique(),
    }

    let resolution = Resolution {
        customer_token_account: accounts.customer_token_account,
        customer_payment_account: accounts.customer_payment_account,
        genuine_vault: accounts.custody_vault == genuine.custody_vault,
    };
    (accounts, resolution)
}

fuzz_target!(|input: LifecycleFuzzInput| {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime");
    runtime.block_on(async {
        if let Err(e) = fuzz_lifecycle_once(input).await {
            eprintln!("Fuzz iteration failed: {}", e);
        }
    });
});

