use anchor_lang::prelude::AccountInfo;
use anchor_lang::solana_program::entrypoint::ProgramResult;
use anchor_lang::AccountDeserialize;
use anchor_lang::AnchorDeserialize;
use anchor_lang::Discriminator;
use anchor_lang::InstructionData;
use anchor_lang::ToAccountMetas;
use anchor_spl::token::{Mint, TokenAccount};
use asset_redemption::pda::{find_custody_vault_address, find_redemption_record_address};
use asset_redemption::state::RedemptionRecord;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use solana_program_test::*;
use solana_sdk::{
    instruction::{Instruction, InstructionError},
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::{Transaction, TransactionError},
};
use spl_token::instruction as token_instruction;

pub mod model;

// Re-export for convenience
pub use solana_program_test::{BanksClientError, ProgramTestContext};

pub type FuzzResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Test environment with program loaded
pub struct FuzzTestEnv {
    pub program_id: Pubkey,
    pub context: ProgramTestContext,
}

/// The asset mint and the key that can mint it
#[derive(Debug)]
pub struct AssetMintAccounts {
    pub mint: Pubkey,
    pub mint_authority: Keypair,
    pub decimals: u8,
}

/// A customer wallet and its holding account for the asset
#[derive(Debug)]
pub struct CustomerAccounts {
    pub owner: Keypair,
    pub token_account: Pubkey,
}

/// Derived addresses for one mint
#[derive(Debug, Clone, Copy)]
pub struct RedemptionAccounts {
    pub redemption_record: Pubkey,
    pub record_bump: u8,
    pub custody_vault: Pubkey,
    pub custody_bump: u8,
}

/// Account list shared by all three instructions; fields can be swapped to spoof
#[derive(Debug, Clone, Copy)]
pub struct RedemptionIxAccounts {
    pub redemption_record: Pubkey,
    pub customer_token_account: Pubkey,
    pub customer_payment_account: Pubkey,
    pub asset_mint: Pubkey,
    pub custody_vault: Pubkey,
}

/// Complete setup with all accounts
pub struct CompleteSetup {
    pub asset: AssetMintAccounts,
    pub customer: CustomerAccounts,
    pub redemption: RedemptionAccounts,
}

impl CompleteSetup {
    pub fn ix_accounts(&self) -> RedemptionIxAccounts {
        RedemptionIxAccounts {
            redemption_record: self.redemption.redemption_record,
            customer_token_account: self.customer.token_account,
            customer_payment_account: self.customer.owner.pubkey(),
            asset_mint: self.asset.mint,
            custody_vault: self.redemption.custody_vault,
        }
    }
}

// ============================================================================
// Core Setup Functions
// ============================================================================

// Anchor's entry ties every account to one lifetime
fn process_instruction(program_id: &Pubkey, accounts: &[AccountInfo], data: &[u8]) -> ProgramResult {
    let accounts = Box::leak(Box::new(accounts.to_vec()));
    asset_redemption::entry(program_id, accounts, data)
}

/// Creates the basic program test environment with the redemption program loaded
pub async fn setup_program_test() -> FuzzTestEnv {
    let program_id = asset_redemption::id();
    let program_test = ProgramTest::new(
        "asset_redemption",
        program_id,
        processor!(process_instruction),
    );

    let context = program_test.start_with_context().await;

    FuzzTestEnv {
        program_id,
        context,
    }
}

/// Creates a new SPL token mint to serve as the redeemable asset
pub async fn setup_asset_mint(
    context: &mut ProgramTestContext,
    decimals: u8,
) -> FuzzResult<AssetMintAccounts> {
    let mint_authority = Keypair::new();
    let mint_keypair = Keypair::new();
    let mint = mint_keypair.pubkey();

    let rent = context.banks_client.get_rent().await?;
    let mint_len = 82; // Size of Mint account in SPL Token program
    let mint_rent = rent.minimum_balance(mint_len);

    let create_account_ix = solana_sdk::system_instruction::create_account(
        &context.payer.pubkey(),
        &mint,
        mint_rent,
        mint_len as u64,
        &spl_token::id(),
    );

    let init_mint_ix = token_instruction::initialize_mint(
        &spl_token::id(),
        &mint,
        &mint_authority.pubkey(),
        None,
        decimals,
    )?;

    let tx = Transaction::new_signed_with_payer(
        &[create_account_ix, init_mint_ix],
        Some(&context.payer.pubkey()),
        &[&context.payer, &mint_keypair],
        context.last_blockhash,
    );

    context.banks_client.process_transaction(tx).await?;

    Ok(AssetMintAccounts {
        mint,
        mint_authority,
        decimals,
    })
}

/// Funds a fresh customer wallet and opens its token account for `mint`
pub async fn setup_customer(
    context: &mut ProgramTestContext,
    mint: &Pubkey,
) -> FuzzResult<CustomerAccounts> {
    let owner = Keypair::new();

    let rent = context.banks_client.get_rent().await?;
    let lamports = rent.minimum_balance(0) + 1_000_000_000; // 1 SOL

    let fund_ix = solana_sdk::system_instruction::transfer(
        &context.payer.pubkey(),
        &owner.pubkey(),
        lamports,
    );

    let account_len = 165; // Size of Token account in SPL Token program
    let token_account = Keypair::new();
    let create_ix = solana_sdk::system_instruction::create_account(
        &context.payer.pubkey(),
        &token_account.pubkey(),
        rent.minimum_balance(account_len),
        account_len as u64,
        &spl_token::id(),
    );

    let init_ix = token_instruction::initialize_account(
        &spl_token::id(),
        &token_account.pubkey(),
        mint,
        &owner.pubkey(),
    )?;

    let tx = Transaction::new_signed_with_payer(
        &[fund_ix, create_ix, init_ix],
        Some(&context.payer.pubkey()),
        &[&context.payer, &token_account],
        context.last_blockhash,
    );

    context.banks_client.process_transaction(tx).await?;

    Ok(CustomerAccounts {
        owner,
        token_account: token_account.pubkey(),
    })
}

/// Mints asset units into a token account
pub async fn mint_asset_to(
    context: &mut ProgramTestContext,
    mint: &Pubkey,
    mint_authority: &Keypair,
    destination: &Pubkey,
    amount: u64,
) -> FuzzResult<()> {
    let mint_to_ix = token_instruction::mint_to(
        &spl_token::id(),
        mint,
        destination,
        &mint_authority.pubkey(),
        &[],
        amount,
    )?;

    let tx = Transaction::new_signed_with_payer(
        &[mint_to_ix],
        Some(&context.payer.pubkey()),
        &[&context.payer, mint_authority],
        context.last_blockhash,
    );

    context.banks_client.process_transaction(tx).await?;

    Ok(())
}

/// Sets up everything: asset mint (decimals 0) + customer holding `initial_customer_balance`
pub async fn setup_complete_environment(
    initial_customer_balance: u64,
) -> FuzzResult<(FuzzTestEnv, CompleteSetup)> {
    let mut env = setup_program_test().await;

    let asset = setup_asset_mint(&mut env.context, 0).await?;
    let customer = setup_customer(&mut env.context, &asset.mint).await?;

    if initial_customer_balance > 0 {
        mint_asset_to(
            &mut env.context,
            &asset.mint,
            &asset.mint_authority,
            &customer.token_account,
            initial_customer_balance,
        )
        .await?;
    }

    let redemption = derive_redemption_accounts(&asset.mint);

    let setup = CompleteSetup {
        asset,
        customer,
        redemption,
    };

    Ok((env, setup))
}

// ============================================================================
// Instruction Builders
// ============================================================================

pub fn initialize_redemption_ix(program_id: &Pubkey, accounts: &RedemptionIxAccounts) -> Instruction {
    let metas = asset_redemption::accounts::InitializeRedemption {
        redemption_record: accounts.redemption_record,
        customer_token_account: accounts.customer_token_account,
        customer_payment_account: accounts.customer_payment_account,
        asset_mint: accounts.asset_mint,
        custody_vault: accounts.custody_vault,
        token_program: spl_token::id(),
        rent: solana_sdk::sysvar::rent::id(),
        system_program: solana_sdk::system_program::ID,
    };

    Instruction {
        program_id: *program_id,
        accounts: metas.to_account_metas(None),
        data: asset_redemption::instruction::InitializeRedemption {}.data(),
    }
}

pub fn return_asset_token_ix(program_id: &Pubkey, accounts: &RedemptionIxAccounts) -> Instruction {
    let metas = asset_redemption::accounts::ReturnAssetToken {
        redemption_record: accounts.redemption_record,
        customer_token_account: accounts.customer_token_account,
        customer_payment_account: accounts.customer_payment_account,
        asset_mint: accounts.asset_mint,
        custody_vault: accounts.custody_vault,
        token_program: spl_token::id(),
    };

    Instruction {
        program_id: *program_id,
        accounts: metas.to_account_metas(None),
        data: asset_redemption::instruction::ReturnAssetToken {}.data(),
    }
}

pub fn burn_asset_token_ix(program_id: &Pubkey, accounts: &RedemptionIxAccounts) -> Instruction {
    let metas = asset_redemption::accounts::BurnAssetToken {
        redemption_record: accounts.redemption_record,
        customer_token_account: accounts.customer_token_account,
        customer_payment_account: accounts.customer_payment_account,
        asset_mint: accounts.asset_mint,
        custody_vault: accounts.custody_vault,
        token_program: spl_token::id(),
    };

    Instruction {
        program_id: *program_id,
        accounts: metas.to_account_metas(None),
        data: asset_redemption::instruction::BurnAssetToken {}.data(),
    }
}

/// Sends `ix` with the context payer as fee payer plus any extra signers.
///
/// A fresh blockhash is fetched each time so repeating an identical
/// instruction is never deduplicated as an already processed transaction.
pub async fn send_instruction(
    context: &mut ProgramTestContext,
    ix: Instruction,
    signers: &[&Keypair],
) -> Result<(), BanksClientError> {
    let blockhash = context.get_new_latest_blockhash().await?;

    let mut all_signers: Vec<&Keypair> = vec![&context.payer];
    all_signers.extend_from_slice(signers);

    let tx = Transaction::new_signed_with_payer(
        &[ix],
        Some(&context.payer.pubkey()),
        &all_signers,
        blockhash,
    );

    context.banks_client.process_transaction(tx).await
}

/// Like `send_instruction`, but hands back the transaction's log lines
pub async fn send_instruction_with_logs(
    context: &mut ProgramTestContext,
    ix: Instruction,
    signers: &[&Keypair],
) -> Result<Vec<String>, BanksClientError> {
    let blockhash = context.get_new_latest_blockhash().await?;

    let mut all_signers: Vec<&Keypair> = vec![&context.payer];
    all_signers.extend_from_slice(signers);

    let tx = Transaction::new_signed_with_payer(
        &[ix],
        Some(&context.payer.pubkey()),
        &all_signers,
        blockhash,
    );

    let processed = context
        .banks_client
        .process_transaction_with_metadata(tx)
        .await?;
    processed.result.map_err(BanksClientError::TransactionError)?;

    Ok(processed
        .metadata
        .map(|metadata| metadata.log_messages)
        .unwrap_or_default())
}

/// Decodes every `E` event the program emitted into `logs`
pub fn emitted_events<E: Discriminator + AnchorDeserialize>(logs: &[String]) -> Vec<E> {
    logs.iter()
        .filter_map(|line| line.strip_prefix("Program data: "))
        .filter_map(|encoded| STANDARD.decode(encoded).ok())
        .filter_map(|data| {
            data.strip_prefix(E::DISCRIMINATOR)
                .and_then(|payload| E::try_from_slice(payload).ok())
        })
        .collect()
}

/// Points the instruction's token program slot at `token_program`
pub fn with_token_program(mut ix: Instruction, token_program: Pubkey) -> Instruction {
    for meta in ix.accounts.iter_mut().filter(|meta| meta.pubkey == spl_token::id()) {
        meta.pubkey = token_program;
    }
    ix
}

/// Extracts the program's custom error code from a failed transaction
pub fn custom_error_code(err: &BanksClientError) -> Option<u32> {
    let tx_err = match err {
        BanksClientError::TransactionError(err) => err,
        BanksClientError::SimulationError { err, .. } => err,
        _ => return None,
    };

    match tx_err {
        TransactionError::InstructionError(_, InstructionError::Custom(code)) => Some(*code),
        _ => None,
    }
}

// ============================================================================
// PDA Derivation Helpers
// ============================================================================

/// Derive both redemption addresses for a mint
pub fn derive_redemption_accounts(mint: &Pubkey) -> RedemptionAccounts {
    let (redemption_record, record_bump) = find_redemption_record_address(mint);
    let (custody_vault, custody_bump) = find_custody_vault_address(mint);

    RedemptionAccounts {
        redemption_record,
        record_bump,
        custody_vault,
        custody_bump,
    }
}

// ============================================================================
// Account State Verification Helpers
// ============================================================================

/// Whether any account currently lives at `address`
pub async fn account_exists(context: &mut ProgramTestContext, address: &Pubkey) -> FuzzResult<bool> {
    Ok(context.banks_client.get_account(*address).await?.is_some())
}

pub async fn get_lamports(context: &mut ProgramTestContext, address: &Pubkey) -> FuzzResult<u64> {
    Ok(context.banks_client.get_balance(*address).await?)
}

/// Get token account balance
pub async fn get_token_balance(
    context: &mut ProgramTestContext,
    account: &Pubkey,
) -> FuzzResult<u64> {
    let account_data = context
        .banks_client
        .get_account(*account)
        .await?
        .ok_or("Token account not found")?;

    let token_account = TokenAccount::try_deserialize(&mut account_data.data.as_ref())?;
    Ok(token_account.amount)
}

/// Get mint supply
pub async fn get_mint_supply(
    context: &mut ProgramTestContext,
    mint: &Pubkey,
) -> FuzzResult<u64> {
    let account = context
        .banks_client
        .get_account(*mint)
        .await?
        .ok_or("Mint account not found")?;

    let mint = Mint::try_deserialize(&mut account.data.as_ref())?;
    Ok(mint.supply)
}

/// Fetch the live redemption record
pub async fn get_redemption_record(
    context: &mut ProgramTestContext,
    redemption_record: &Pubkey,
) -> FuzzResult<RedemptionRecord> {
    let account = context
        .banks_client
        .get_account(*redemption_record)
        .await?
        .ok_or("Redemption record not found")?;

    let record = RedemptionRecord::try_deserialize(&mut account.data.as_ref())?;
    Ok(record)
}

/// Snapshot of everything a redemption instruction may touch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub supply: u64,
    pub customer_balance: u64,
    pub vault_balance: Option<u64>,
    pub record_exists: bool,
}

pub async fn snapshot(context: &mut ProgramTestContext, setup: &CompleteSetup) -> FuzzResult<LedgerSnapshot> {
    let supply = get_mint_supply(context, &setup.asset.mint).await?;
    let customer_balance = get_token_balance(context, &setup.customer.token_account).await?;
    let vault_balance = if account_exists(context, &setup.redemption.custody_vault).await? {
        Some(get_token_balance(context, &setup.redemption.custody_vault).await?)
    } else {
        None
    };
    let record_exists = account_exists(context, &setup.redemption.redemption_record).await?;

    Ok(LedgerSnapshot {
        supply,
        customer_balance,
        vault_balance,
        record_exists,
    })
}
