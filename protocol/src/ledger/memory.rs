//! In-memory reference ledger.
//!
//! All tables sit behind one `parking_lot::Mutex`; proof verification runs
//! against a separate `BaseTable` lock so a slow verification never blocks
//! balance reads. A transaction is checked completely before any table is
//! written, so a rejected submission leaves no trace beyond roll-overs.
//!
//! A transfer takes the table lock twice. The second pass rejects it if the
//! epoch moved on or a party's balance is no longer the one the proof was
//! verified against. New account values are staged before anything is
//! written.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use ark_ff::Zero;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::{
    BurnTransaction, KeyUpdate, Ledger, LedgerError, LedgerParameters, Receipt, TransferEvent,
    TransferTransaction, TxId,
};
use crate::account::{Clock, EpochSchedule};
use crate::config::{EVENT_CHANNEL_CAPACITY, MAX_BALANCE, POINT_LENGTH};
use crate::crypto::curve::{generator, point_to_bytes, point_to_hex, Point, Scalar};
use crate::crypto::encryption::ElGamal;
use crate::crypto::hash::{keccak256, word};
use crate::crypto::keys::{verify_registration, Address, RegistrationSignature};
use crate::zkp::{
    verify_burn, verify_transfer, BaseTable, BurnProof, BurnStatement, TransferProof,
    TransferStatement,
};

type AccountKey = [u8; POINT_LENGTH];

#[derive(Clone, Copy, Debug)]
struct Account {
    acc: ElGamal,
    pending: ElGamal,
    last_roll_over: u64,
}

impl Account {
    fn simulate(&self, epoch: u64) -> ElGamal {
        if self.last_roll_over < epoch {
            self.acc + self.pending
        } else {
            self.acc
        }
    }

    fn pending_at(&self, epoch: u64) -> ElGamal {
        if self.last_roll_over < epoch {
            ElGamal::zero()
        } else {
            self.pending
        }
    }

    fn roll_over(&mut self, epoch: u64) {
        if self.last_roll_over < epoch {
            self.acc += self.pending;
            self.pending = ElGamal::zero();
            self.last_roll_over = epoch;
        }
    }
}

#[derive(Default)]
struct Tables {
    accounts: HashMap<AccountKey, Account>,
    nonce_epoch: u64,
    nonces: HashSet<AccountKey>,
    sequence: u64,
}

impl Tables {
    fn account_mut(&mut self, key: &Point) -> Result<&mut Account, LedgerError> {
        self.accounts
            .get_mut(&point_to_bytes(key))
            .ok_or_else(|| not_registered(key))
    }

    /// The account under `key`, provided its balance is still `verified`.
    fn unchanged(&self, key: &Point, verified: &ElGamal) -> Result<Account, LedgerError> {
        let account = self
            .accounts
            .get(&point_to_bytes(key))
            .ok_or_else(|| not_registered(key))?;
        if account.acc != *verified {
            return Err(LedgerError::AccountChanged {
                key: point_to_hex(key),
            });
        }
        Ok(*account)
    }

    fn check_registered(&self, key: &Point) -> Result<(), LedgerError> {
        if self.accounts.contains_key(&point_to_bytes(key)) {
            Ok(())
        } else {
            Err(not_registered(key))
        }
    }

    /// Forget last epoch's nonces, then reject `nonce` if seen this epoch.
    fn check_nonce(&mut self, nonce: &Point, epoch: u64) -> Result<(), LedgerError> {
        if self.nonce_epoch < epoch {
            self.nonces.clear();
            self.nonce_epoch = epoch;
        }
        if self.nonces.contains(&point_to_bytes(nonce)) {
            return Err(LedgerError::NonceUsed { epoch });
        }
        Ok(())
    }

    fn next_tx_id(&mut self, payload: &[u8]) -> TxId {
        self.sequence += 1;
        let mut data = word(self.sequence).to_vec();
        data.extend_from_slice(payload);
        TxId(keccak256(&data))
    }
}

fn not_registered(key: &Point) -> LedgerError {
    LedgerError::NotRegistered {
        key: point_to_hex(key),
    }
}

fn distinct(keys: &[Point]) -> Result<(), LedgerError> {
    let mut seen = HashSet::with_capacity(keys.len());
    for key in keys {
        if !seen.insert(point_to_bytes(key)) {
            return Err(LedgerError::DuplicateParty {
                key: point_to_hex(key),
            });
        }
    }
    Ok(())
}

fn check_key_update(update: &KeyUpdate, keys: &[Point], tables: &Tables) -> Result<(), LedgerError> {
    let size = keys.len();
    for (field, actual) in [
        ("up_left", update.up_left.len()),
        ("account_adjust", update.account_adjust.len()),
        ("pending_adjust", update.pending_adjust.len()),
        ("new_keys", update.new_keys.len()),
    ] {
        if actual != size {
            return Err(LedgerError::Malformed(format!(
                "key update {field} has {actual} entries, expected {size}"
            )));
        }
    }
    distinct(&update.new_keys)?;
    // Every party moves by the same `g·δ`, and δ is never zero.
    let shift = match (update.new_keys.first(), keys.first()) {
        (Some(new), Some(old)) => *new - old,
        _ => return Err(LedgerError::Malformed("empty key update".into())),
    };
    if shift.is_zero() {
        return Err(LedgerError::Malformed("key update does not move the keys".into()));
    }
    if keys
        .iter()
        .zip(&update.new_keys)
        .any(|(old, new)| *new - old != shift)
    {
        return Err(LedgerError::Malformed(
            "key update moves parties by different offsets".into(),
        ));
    }
    for key in &update.new_keys {
        if tables.accounts.contains_key(&point_to_bytes(key)) && !keys.contains(key) {
            return Err(LedgerError::AlreadyRegistered {
                key: point_to_hex(key),
            });
        }
    }
    Ok(())
}

/// Single-process ledger holding every account in memory.
pub struct InMemoryLedger {
    address: Address,
    parameters: LedgerParameters,
    schedule: EpochSchedule,
    clock: Arc<dyn Clock>,
    tables: Mutex<Tables>,
    bases: Mutex<BaseTable>,
    events: broadcast::Sender<TransferEvent>,
}

impl InMemoryLedger {
    pub fn new(address: Address, parameters: LedgerParameters, clock: Arc<dyn Clock>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            address,
            parameters,
            schedule: EpochSchedule::new(parameters.epoch_length),
            clock,
            tables: Mutex::new(Tables::default()),
            bases: Mutex::new(BaseTable::new()),
            events,
        }
    }

    pub fn current_epoch(&self) -> u64 {
        self.schedule.epoch_at(self.clock.now_millis())
    }

    pub fn is_registered(&self, key: &Point) -> bool {
        self.tables
            .lock()
            .accounts
            .contains_key(&point_to_bytes(key))
    }

    pub fn account_count(&self) -> usize {
        self.tables.lock().accounts.len()
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    fn address(&self) -> Address {
        self.address
    }

    fn parameters(&self) -> LedgerParameters {
        self.parameters
    }

    async fn register(
        &self,
        key: Point,
        signature: RegistrationSignature,
    ) -> Result<Receipt, LedgerError> {
        if !verify_registration(&self.address, &key, &signature) {
            return Err(LedgerError::InvalidRegistration);
        }
        let epoch = self.current_epoch();
        let mut tables = self.tables.lock();
        let bytes = point_to_bytes(&key);
        if tables.accounts.contains_key(&bytes) {
            return Err(LedgerError::AlreadyRegistered {
                key: point_to_hex(&key),
            });
        }
        // An encryption of zero with randomness one: never the zero ciphertext.
        tables.accounts.insert(
            bytes,
            Account {
                acc: ElGamal::new(key, generator()),
                pending: ElGamal::zero(),
                last_roll_over: epoch,
            },
        );
        let tx_id = tables.next_tx_id(&bytes);
        info!(key = %point_to_hex(&key), epoch, "account registered");
        Ok(Receipt { tx_id, epoch })
    }

    async fn fund(&self, key: Point, value: u64) -> Result<Receipt, LedgerError> {
        if value > MAX_BALANCE {
            return Err(LedgerError::ValueTooLarge {
                value,
                max: MAX_BALANCE,
            });
        }
        let epoch = self.current_epoch();
        let mut tables = self.tables.lock();
        let account = tables.account_mut(&key)?;
        account.roll_over(epoch);
        account.pending = account.pending.plus(Scalar::from(value));
        let tx_id = tables.next_tx_id(&word(value));
        debug!(value, epoch, "account funded");
        Ok(Receipt { tx_id, epoch })
    }

    async fn simulate_accounts(&self, keys: &[Point], epoch: u64) -> Vec<ElGamal> {
        let tables = self.tables.lock();
        keys.iter()
            .map(|key| {
                tables
                    .accounts
                    .get(&point_to_bytes(key))
                    .map_or_else(ElGamal::zero, |account| account.simulate(epoch))
            })
            .collect()
    }

    async fn pending_accounts(&self, keys: &[Point], epoch: u64) -> Vec<ElGamal> {
        let tables = self.tables.lock();
        keys.iter()
            .map(|key| {
                tables
                    .accounts
                    .get(&point_to_bytes(key))
                    .map_or_else(ElGamal::zero, |account| account.pending_at(epoch))
            })
            .collect()
    }

    async fn transfer(&self, transaction: TransferTransaction) -> Result<Receipt, LedgerError> {
        let size = transaction.keys.len();
        if transaction.deltas.len() != size {
            return Err(LedgerError::Malformed(format!(
                "{} deltas for {size} parties",
                transaction.deltas.len()
            )));
        }
        distinct(&transaction.keys)?;
        let proof = TransferProof::from_bytes(&transaction.proof)?;
        let epoch = self.current_epoch();

        let (statement, verified) = {
            let mut tables = self.tables.lock();
            for key in &transaction.keys {
                tables.check_registered(key)?;
            }
            if let Some(beneficiary) = &transaction.beneficiary {
                tables.check_registered(beneficiary)?;
            }
            if let Some(update) = &transaction.key_update {
                check_key_update(update, &transaction.keys, &tables)?;
            }
            tables.check_nonce(&transaction.nonce, epoch)?;

            let mut verified = Vec::with_capacity(size);
            let mut balances = Vec::with_capacity(size);
            for (key, delta) in transaction.keys.iter().zip(&transaction.deltas) {
                let account = tables.account_mut(key)?;
                account.roll_over(epoch);
                verified.push(account.acc);
                balances.push(account.acc + ElGamal::new(*delta, transaction.d));
            }
            let statement = TransferStatement {
                balances,
                deltas: transaction.deltas.clone(),
                d: transaction.d,
                keys: transaction.keys.clone(),
                epoch,
                nonce: transaction.nonce,
                fee: self.parameters.fee,
            };
            (statement, verified)
        };

        if let Err(e) = verify_transfer(&mut self.bases.lock(), &statement, &proof) {
            warn!(error = %e, size, epoch, "transfer rejected");
            return Err(e.into());
        }

        let mut tables = self.tables.lock();
        let current = self.current_epoch();
        if current != epoch {
            warn!(submitted = epoch, current, "epoch ended during verification");
            return Err(LedgerError::EpochChanged {
                submitted: epoch,
                current,
            });
        }
        tables.check_nonce(&transaction.nonce, epoch)?;
        if let Some(update) = &transaction.key_update {
            check_key_update(update, &transaction.keys, &tables)?;
        }

        let mut staged: Vec<(AccountKey, Account)> = Vec::with_capacity(size + 1);
        for ((key, delta), acc) in transaction
            .keys
            .iter()
            .zip(&transaction.deltas)
            .zip(&verified)
        {
            let mut account = tables.unchanged(key, acc)?;
            account.pending += ElGamal::new(*delta, transaction.d);
            staged.push((point_to_bytes(key), account));
        }
        if let Some(beneficiary) = &transaction.beneficiary {
            let bytes = point_to_bytes(beneficiary);
            let fee = Scalar::from(self.parameters.fee);
            match staged.iter_mut().find(|(key, _)| *key == bytes) {
                Some((_, account)) => account.pending = account.pending.plus(fee),
                None => {
                    let mut account = *tables
                        .accounts
                        .get(&bytes)
                        .ok_or_else(|| not_registered(beneficiary))?;
                    account.roll_over(epoch);
                    account.pending = account.pending.plus(fee);
                    staged.push((bytes, account));
                }
            }
        }
        if let Some(update) = &transaction.key_update {
            for (i, (key, account)) in staged.iter_mut().take(size).enumerate() {
                account.acc.left += update.account_adjust[i];
                account.pending.left += update.pending_adjust[i];
                *key = point_to_bytes(&update.new_keys[i]);
            }
        }

        // Nothing below can fail.
        for key in &transaction.keys {
            tables.accounts.remove(&point_to_bytes(key));
        }
        for (key, account) in staged {
            tables.accounts.insert(key, account);
        }
        tables.nonces.insert(point_to_bytes(&transaction.nonce));
        let tx_id = tables.next_tx_id(&transaction.proof);
        drop(tables);

        info!(%tx_id, size, epoch, rekeyed = transaction.key_update.is_some(), "transfer accepted");
        let event = TransferEvent {
            tx_id,
            epoch,
            parties: transaction.keys,
            deltas: transaction.deltas,
            d: transaction.d,
            key_update: transaction.key_update.as_ref().map(KeyUpdate::rotation),
            beneficiary: transaction.beneficiary,
        };
        // No subscribers is not an error.
        let _ = self.events.send(event);
        Ok(Receipt { tx_id, epoch })
    }

    async fn burn(&self, transaction: BurnTransaction) -> Result<Receipt, LedgerError> {
        if transaction.value > MAX_BALANCE {
            return Err(LedgerError::ValueTooLarge {
                value: transaction.value,
                max: MAX_BALANCE,
            });
        }
        let proof = BurnProof::from_bytes(&transaction.proof)?;
        let epoch = self.current_epoch();
        let value = Scalar::from(transaction.value);

        let mut tables = self.tables.lock();
        tables.check_nonce(&transaction.nonce, epoch)?;
        let account = tables.account_mut(&transaction.key)?;
        account.roll_over(epoch);
        let statement = BurnStatement {
            balance: account.acc.plus(-value),
            key: transaction.key,
            epoch,
            nonce: transaction.nonce,
            sender: transaction.sender,
        };
        if let Err(e) = verify_burn(&statement, &proof) {
            warn!(error = %e, epoch, "burn rejected");
            return Err(e.into());
        }
        account.pending = account.pending.plus(-value);
        tables.nonces.insert(point_to_bytes(&transaction.nonce));
        let tx_id = tables.next_tx_id(&transaction.proof);
        info!(%tx_id, value = transaction.value, epoch, "burn accepted");
        Ok(Receipt { tx_id, epoch })
    }

    fn subscribe(&self) -> broadcast::Receiver<TransferEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::TokioClock;
    use crate::crypto::curve::{epoch_generator, random_scalar};
    use crate::crypto::encryption::decrypt;
    use crate::crypto::keys::Keypair;
    use crate::zkp::{BurnWitness, TransferWitness};
    use ark_std::rand::{rngs::StdRng, SeedableRng};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    const EPOCH_MILLIS: u64 = 8_000;

    fn ledger(fee: u64, rng: &mut StdRng) -> InMemoryLedger {
        let parameters = LedgerParameters {
            epoch_length: EPOCH_MILLIS / 1000,
            fee,
        };
        InMemoryLedger::new(Address::random(rng), parameters, Arc::new(TokioClock::new(0)))
    }

    async fn registered(ledger: &InMemoryLedger, rng: &mut StdRng) -> Keypair {
        let keypair = Keypair::generate(rng);
        let signature = keypair.sign_registration(&ledger.address(), rng);
        ledger.register(keypair.public(), signature).await.unwrap();
        keypair
    }

    #[derive(Default)]
    struct ManualClock(AtomicU64);

    impl ManualClock {
        fn set(&self, millis: u64) {
            self.0.store(millis, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_millis(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    /// Alice holds 100 and Bob nothing, one epoch after funding.
    async fn funded_pair(
        rng: &mut StdRng,
    ) -> (Arc<InMemoryLedger>, Arc<ManualClock>, Keypair, Keypair) {
        let clock = Arc::new(ManualClock::default());
        let shared: Arc<dyn Clock> = clock.clone();
        let parameters = LedgerParameters {
            epoch_length: EPOCH_MILLIS / 1000,
            fee: 1,
        };
        let ledger = Arc::new(InMemoryLedger::new(Address::random(rng), parameters, shared));
        let alice = registered(&ledger, rng).await;
        let bob = registered(&ledger, rng).await;
        ledger.fund(alice.public(), 100).await.unwrap();
        clock.set(EPOCH_MILLIS);
        (ledger, clock, alice, bob)
    }

    /// Submit `transaction` and run `meddle` while its proof is being
    /// verified.
    async fn interleaved(
        ledger: &Arc<InMemoryLedger>,
        transaction: TransferTransaction,
        meddle: impl FnOnce(&InMemoryLedger),
    ) -> Result<Receipt, LedgerError> {
        let sender = point_to_bytes(&transaction.keys[0]);
        let epoch = ledger.current_epoch();
        let bases = ledger.bases.lock();
        let submission = tokio::spawn({
            let ledger = Arc::clone(ledger);
            async move { ledger.transfer(transaction).await }
        });
        // The first pass rolls the sender over just before verifying.
        while ledger.tables.lock().accounts[&sender].last_roll_over < epoch
            && !submission.is_finished()
        {
            tokio::task::yield_now().await;
        }
        meddle(ledger);
        drop(bases);
        submission.await.unwrap()
    }

    fn stored(ledger: &InMemoryLedger, key: &Point) -> Account {
        ledger.tables.lock().accounts[&point_to_bytes(key)]
    }

    fn nonce_recorded(ledger: &InMemoryLedger, nonce: &Point) -> bool {
        ledger.tables.lock().nonces.contains(&point_to_bytes(nonce))
    }

    async fn next_epoch() {
        tokio::time::advance(Duration::from_millis(EPOCH_MILLIS)).await;
    }

    async fn balance(ledger: &InMemoryLedger, keypair: &Keypair) -> u64 {
        let epoch = ledger.current_epoch();
        let state = ledger.simulate_accounts(&[keypair.public()], epoch).await;
        decrypt(&state[0], &keypair.secret(), 1_000).unwrap()
    }

    /// A two-party transfer of `value` from `sender` to `receiver` built
    /// against the ledger's current state.
    async fn transfer_between(
        ledger: &InMemoryLedger,
        sender: &Keypair,
        receiver: &Keypair,
        value: u64,
        available: u64,
        rng: &mut StdRng,
    ) -> TransferTransaction {
        let fee = ledger.parameters().fee;
        let epoch = ledger.current_epoch();
        let keys = vec![sender.public(), receiver.public()];
        let accounts = ledger.simulate_accounts(&keys, epoch).await;
        let r = random_scalar(rng);
        let d = generator() * r;
        let moved = [-Scalar::from(value + fee), Scalar::from(value)];
        let deltas: Vec<Point> = keys
            .iter()
            .zip(moved)
            .map(|(key, amount)| ElGamal::encrypt_with(key, amount, r).left)
            .collect();
        let statement = TransferStatement {
            balances: accounts
                .iter()
                .zip(&deltas)
                .map(|(acc, c)| *acc + ElGamal::new(*c, d))
                .collect(),
            deltas: deltas.clone(),
            d,
            keys: keys.clone(),
            epoch,
            nonce: epoch_generator(epoch) * sender.secret(),
            fee,
        };
        let witness = TransferWitness {
            secret: sender.secret(),
            randomness: r,
            amount: value,
            remaining: available - value - fee,
            sender_index: 0,
            receiver_index: 1,
        };
        let proof = TransferProof::prove(&mut BaseTable::new(), &statement, &witness, rng).unwrap();
        TransferTransaction {
            deltas,
            d,
            keys,
            nonce: statement.nonce,
            beneficiary: None,
            proof: proof.to_bytes(),
            key_update: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn registration_rules() {
        let mut rng = StdRng::seed_from_u64(42);
        let ledger = ledger(0, &mut rng);
        let alice = registered(&ledger, &mut rng).await;
        assert!(ledger.is_registered(&alice.public()));
        assert_eq!(balance(&ledger, &alice).await, 0);

        let again = alice.sign_registration(&ledger.address(), &mut rng);
        assert!(matches!(
            ledger.register(alice.public(), again).await,
            Err(LedgerError::AlreadyRegistered { .. })
        ));

        let bob = Keypair::generate(&mut rng);
        let forged = alice.sign_registration(&ledger.address(), &mut rng);
        assert!(matches!(
            ledger.register(bob.public(), forged).await,
            Err(LedgerError::InvalidRegistration)
        ));
        let state = ledger.simulate_accounts(&[bob.public()], 0).await;
        assert!(state[0].is_zero());
    }

    #[tokio::test(start_paused = true)]
    async fn funds_become_available_next_epoch() {
        let mut rng = StdRng::seed_from_u64(42);
        let ledger = ledger(0, &mut rng);
        let alice = registered(&ledger, &mut rng).await;
        ledger.fund(alice.public(), 100).await.unwrap();
        assert_eq!(balance(&ledger, &alice).await, 0);

        let pending = ledger.pending_accounts(&[alice.public()], 0).await;
        assert_eq!(decrypt(&pending[0], &alice.secret(), 1_000), Ok(100));

        next_epoch().await;
        assert_eq!(balance(&ledger, &alice).await, 100);
        let pending = ledger.pending_accounts(&[alice.public()], 1).await;
        assert!(pending[0].is_zero());

        assert!(matches!(
            ledger.fund(alice.public(), MAX_BALANCE + 1).await,
            Err(LedgerError::ValueTooLarge { .. })
        ));
        let stranger = Keypair::generate(&mut rng);
        assert!(matches!(
            ledger.fund(stranger.public(), 1).await,
            Err(LedgerError::NotRegistered { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn transfer_moves_value_and_announces_it() {
        let mut rng = StdRng::seed_from_u64(42);
        let ledger = ledger(1, &mut rng);
        let alice = registered(&ledger, &mut rng).await;
        let bob = registered(&ledger, &mut rng).await;
        ledger.fund(alice.public(), 100).await.unwrap();
        next_epoch().await;

        let mut events = ledger.subscribe();
        let transaction = transfer_between(&ledger, &alice, &bob, 10, 100, &mut rng).await;
        let receipt = ledger.transfer(transaction.clone()).await.unwrap();
        assert_eq!(receipt.epoch, 1);

        let event = events.try_recv().unwrap();
        assert_eq!(event.tx_id, receipt.tx_id);
        assert_eq!(event.parties, transaction.keys);
        let credit = event.delta(1).unwrap();
        assert_eq!(decrypt(&credit, &bob.secret(), 1_000), Ok(10));

        // Replaying in the same epoch trips the nonce.
        assert!(matches!(
            ledger.transfer(transaction).await,
            Err(LedgerError::NonceUsed { epoch: 1 })
        ));

        next_epoch().await;
        assert_eq!(balance(&ledger, &alice).await, 89);
        assert_eq!(balance(&ledger, &bob).await, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn transfer_rejects_stale_or_tampered_submissions() {
        let mut rng = StdRng::seed_from_u64(42);
        let ledger = ledger(0, &mut rng);
        let alice = registered(&ledger, &mut rng).await;
        let bob = registered(&ledger, &mut rng).await;
        ledger.fund(alice.public(), 50).await.unwrap();
        next_epoch().await;

        let mut transaction = transfer_between(&ledger, &alice, &bob, 5, 50, &mut rng).await;
        transaction.deltas.swap(0, 1);
        assert!(matches!(
            ledger.transfer(transaction).await,
            Err(LedgerError::Verification(_))
        ));

        let transaction = transfer_between(&ledger, &alice, &bob, 5, 50, &mut rng).await;
        next_epoch().await;
        assert!(matches!(
            ledger.transfer(transaction).await,
            Err(LedgerError::Verification(_))
        ));

        let mut transaction = transfer_between(&ledger, &alice, &bob, 5, 50, &mut rng).await;
        transaction.keys[1] = transaction.keys[0];
        assert!(matches!(
            ledger.transfer(transaction).await,
            Err(LedgerError::DuplicateParty { .. })
        ));

        let mut transaction = transfer_between(&ledger, &alice, &bob, 5, 50, &mut rng).await;
        transaction.proof.pop();
        assert!(matches!(
            ledger.transfer(transaction).await,
            Err(LedgerError::Encoding(_))
        ));
        assert_eq!(balance(&ledger, &alice).await, 50);
    }

    #[tokio::test(start_paused = true)]
    async fn burn_debits_once_per_epoch() {
        let mut rng = StdRng::seed_from_u64(42);
        let ledger = ledger(0, &mut rng);
        let alice = registered(&ledger, &mut rng).await;
        ledger.fund(alice.public(), 40).await.unwrap();
        next_epoch().await;

        let epoch = ledger.current_epoch();
        let sender = Address::random(&mut rng);
        let acc = ledger.simulate_accounts(&[alice.public()], epoch).await[0];
        let statement = BurnStatement {
            balance: acc.plus(-Scalar::from(15u64)),
            key: alice.public(),
            epoch,
            nonce: epoch_generator(epoch) * alice.secret(),
            sender,
        };
        let witness = BurnWitness {
            secret: alice.secret(),
            remaining: 25,
        };
        let proof = BurnProof::prove(&statement, &witness, &mut rng);
        let transaction = BurnTransaction {
            key: alice.public(),
            value: 15,
            nonce: statement.nonce,
            sender,
            proof: proof.to_bytes(),
        };

        let mut stolen = transaction.clone();
        stolen.sender = Address::random(&mut rng);
        assert!(matches!(
            ledger.burn(stolen).await,
            Err(LedgerError::Verification(_))
        ));

        ledger.burn(transaction.clone()).await.unwrap();
        assert!(matches!(
            ledger.burn(transaction).await,
            Err(LedgerError::NonceUsed { .. })
        ));
        next_epoch().await;
        assert_eq!(balance(&ledger, &alice).await, 25);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn rekey_during_verification_leaves_no_partial_write() {
        let mut rng = StdRng::seed_from_u64(42);
        let (ledger, _clock, alice, bob) = funded_pair(&mut rng).await;
        let transaction = transfer_between(&ledger, &alice, &bob, 10, 100, &mut rng).await;
        let nonce = transaction.nonce;

        let bob_key = bob.public();
        let result = interleaved(&ledger, transaction.clone(), move |ledger| {
            let mut tables = ledger.tables.lock();
            let mut account = tables.accounts.remove(&point_to_bytes(&bob_key)).unwrap();
            account.acc.left += account.acc.right;
            account.pending.left += account.pending.right;
            tables
                .accounts
                .insert(point_to_bytes(&(bob_key + generator())), account);
        })
        .await;
        assert!(matches!(result, Err(LedgerError::NotRegistered { .. })));

        assert!(stored(&ledger, &alice.public()).pending.is_zero());
        assert!(!nonce_recorded(&ledger, &nonce));
        assert!(matches!(
            ledger.transfer(transaction).await,
            Err(LedgerError::NotRegistered { .. })
        ));
        assert_eq!(balance(&ledger, &alice).await, 100);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn balance_change_during_verification_is_rejected() {
        let mut rng = StdRng::seed_from_u64(42);
        let (ledger, _clock, alice, bob) = funded_pair(&mut rng).await;
        let transaction = transfer_between(&ledger, &alice, &bob, 10, 100, &mut rng).await;
        let nonce = transaction.nonce;

        let bob_key = bob.public();
        let result = interleaved(&ledger, transaction, move |ledger| {
            let mut tables = ledger.tables.lock();
            let account = tables.account_mut(&bob_key).unwrap();
            account.acc = account.acc.plus(Scalar::from(1u64));
        })
        .await;
        assert!(matches!(result, Err(LedgerError::AccountChanged { .. })));
        assert!(stored(&ledger, &alice.public()).pending.is_zero());
        assert!(stored(&ledger, &bob.public()).pending.is_zero());
        assert!(!nonce_recorded(&ledger, &nonce));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn epoch_boundary_during_verification_is_rejected() {
        let mut rng = StdRng::seed_from_u64(42);
        let (ledger, clock, alice, bob) = funded_pair(&mut rng).await;
        let transaction = transfer_between(&ledger, &alice, &bob, 10, 100, &mut rng).await;
        let nonce = transaction.nonce;

        let result = interleaved(&ledger, transaction, |_| clock.set(2 * EPOCH_MILLIS)).await;
        assert!(matches!(
            result,
            Err(LedgerError::EpochChanged {
                submitted: 1,
                current: 2
            })
        ));
        assert!(!nonce_recorded(&ledger, &nonce));
        assert!(stored(&ledger, &alice.public()).pending.is_zero());
        assert_eq!(balance(&ledger, &alice).await, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn key_update_must_shift_every_party_alike() {
        let mut rng = StdRng::seed_from_u64(42);
        let ledger = ledger(0, &mut rng);
        let alice = registered(&ledger, &mut rng).await;
        let bob = registered(&ledger, &mut rng).await;
        ledger.fund(alice.public(), 50).await.unwrap();
        next_epoch().await;

        let g = generator();
        let update = |shifts: [Point; 2]| KeyUpdate {
            up_left: vec![g, g],
            up_right: g,
            account_adjust: vec![Point::zero(); 2],
            pending_adjust: vec![Point::zero(); 2],
            new_keys: vec![alice.public() + shifts[0], bob.public() + shifts[1]],
        };
        for shifts in [[g, g + g], [Point::zero(), Point::zero()]] {
            let mut transaction = transfer_between(&ledger, &alice, &bob, 5, 50, &mut rng).await;
            transaction.key_update = Some(update(shifts));
            assert!(matches!(
                ledger.transfer(transaction).await,
                Err(LedgerError::Malformed(_))
            ));
        }
        assert!(ledger.is_registered(&alice.public()));
        assert!(ledger.is_registered(&bob.public()));
        assert_eq!(balance(&ledger, &alice).await, 50);
    }
}
