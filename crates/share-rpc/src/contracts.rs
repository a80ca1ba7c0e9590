//! Access and catalog contracts reached over JSON-RPC

use crate::abi::{self, Decoder, Token};
use crate::client::{ConfirmationPolicy, JsonRpcClient};
use crate::config::LedgerConfig;
use crate::error::RpcError;
use medshare_core::{
    AccessHistoryPage, AccessLedger, Address, LedgerError, RecordCatalog, RecordId,
    SharedRecordsPage, TxReceipt,
};
use tracing::debug;

/// Canonical contract signatures
pub mod signatures {
    pub const GRANT_ACCESS: &str = "grantAccess(string,address,uint256)";
    pub const REVOKE_ACCESS: &str = "revokeAccess(string,address)";
    pub const CHECK_ACCESS_EXPIRY: &str = "checkAccessExpiry(string,address)";
    pub const GET_ACCESS_HISTORY: &str = "getAccessHistory(string)";
    pub const GET_SHARED_RECORDS: &str = "getSharedRecords(address)";
    pub const GET_RECORDS_BY_OWNER: &str = "getRecordsByOwner(address)";
}

/// Ledger backed by deployed access and catalog contracts
pub struct EthLedger {
    rpc: JsonRpcClient,
    access_contract: Address,
    catalog_contract: Address,
    confirmation: ConfirmationPolicy,
}

impl EthLedger {
    pub fn new(
        rpc: JsonRpcClient,
        access_contract: Address,
        catalog_contract: Address,
        confirmation: ConfirmationPolicy,
    ) -> Self {
        EthLedger {
            rpc,
            access_contract,
            catalog_contract,
            confirmation,
        }
    }

    pub fn from_config(config: &LedgerConfig) -> Result<Self, RpcError> {
        let rpc = JsonRpcClient::new(&config.rpc_url, config.request_timeout())?;
        Ok(EthLedger::new(
            rpc,
            config.access_contract,
            config.catalog_contract,
            config.confirmation_policy(),
        ))
    }

    async fn view(&self, contract: &Address, data: Vec<u8>) -> Result<Vec<u8>, LedgerError> {
        self.rpc
            .call(contract, &data)
            .await
            .map_err(RpcError::into_read_error)
    }

    async fn transact(
        &self,
        sender: &Address,
        data: Vec<u8>,
        action: &'static str,
    ) -> Result<TxReceipt, LedgerError> {
        let tx_hash = self
            .rpc
            .send_transaction(sender, &self.access_contract, &data)
            .await
            .map_err(RpcError::into_write_error)?;
        debug!(tx = %tx_hash, action, "transaction submitted; awaiting confirmation");
        self.rpc
            .wait_for_receipt(&tx_hash, &self.confirmation)
            .await
            .map_err(RpcError::into_write_error)
    }
}

impl AccessLedger for EthLedger {
    async fn grant_access(
        &self,
        sender: &Address,
        record_id: &RecordId,
        grantee: &Address,
        duration_secs: u64,
    ) -> Result<TxReceipt, LedgerError> {
        let data = abi::encode_call(
            signatures::GRANT_ACCESS,
            &[
                Token::String(record_id.to_string()),
                Token::Address(*grantee),
                Token::Uint(duration_secs),
            ],
        );
        self.transact(sender, data, "grant").await
    }

    async fn revoke_access(
        &self,
        sender: &Address,
        record_id: &RecordId,
        grantee: &Address,
    ) -> Result<TxReceipt, LedgerError> {
        let data = abi::encode_call(
            signatures::REVOKE_ACCESS,
            &[Token::String(record_id.to_string()), Token::Address(*grantee)],
        );
        self.transact(sender, data, "revoke").await
    }

    async fn check_access_expiry(
        &self,
        record_id: &RecordId,
        grantee: &Address,
    ) -> Result<i64, LedgerError> {
        let data = abi::encode_call(
            signatures::CHECK_ACCESS_EXPIRY,
            &[Token::String(record_id.to_string()), Token::Address(*grantee)],
        );
        let out = self.view(&self.access_contract, data).await?;
        decode_expiry(&out).map_err(|e| match e.into_read_error() {
            LedgerError::Decode(msg) => LedgerError::Decode(format!("expiry of {}: {}", record_id, msg)),
            other => other,
        })
    }

    async fn access_history(&self, record_id: &RecordId) -> Result<AccessHistoryPage, LedgerError> {
        let data = abi::encode_call(
            signatures::GET_ACCESS_HISTORY,
            &[Token::String(record_id.to_string())],
        );
        let out = self.view(&self.access_contract, data).await?;
        decode_history(&out).map_err(RpcError::into_read_error)
    }
}

impl RecordCatalog for EthLedger {
    async fn shared_with(&self, grantee: &Address) -> Result<SharedRecordsPage, LedgerError> {
        let data = abi::encode_call(signatures::GET_SHARED_RECORDS, &[Token::Address(*grantee)]);
        let out = self.view(&self.catalog_contract, data).await?;
        decode_shared_records(&out).map_err(RpcError::into_read_error)
    }

    async fn records_by_owner(&self, owner: &Address) -> Result<Vec<RecordId>, LedgerError> {
        let data = abi::encode_call(signatures::GET_RECORDS_BY_OWNER, &[Token::Address(*owner)]);
        let out = self.view(&self.catalog_contract, data).await?;
        let ids = Decoder::new(&out)
            .string_array(0)
            .map_err(RpcError::into_read_error)?;
        Ok(ids.into_iter().map(RecordId).collect())
    }
}

fn decode_expiry(out: &[u8]) -> Result<i64, RpcError> {
    let raw = Decoder::new(out).uint(0)?;
    to_timestamp(raw)
}

fn decode_history(out: &[u8]) -> Result<AccessHistoryPage, RpcError> {
    let decoder = Decoder::new(out);
    Ok(AccessHistoryPage {
        grantees: decoder.address_array(0)?,
        granted_at: timestamps(decoder.uint_array(1)?)?,
        expires_at: timestamps(decoder.uint_array(2)?)?,
    })
}

fn decode_shared_records(out: &[u8]) -> Result<SharedRecordsPage, RpcError> {
    let decoder = Decoder::new(out);
    let ages = decoder
        .uint_array(2)?
        .into_iter()
        .map(|age| u32::try_from(age).map_err(|_| RpcError::Abi(format!("age {} out of range", age))))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SharedRecordsPage {
        ids: decoder.string_array(0)?,
        patient_names: decoder.string_array(1)?,
        ages,
        genders: decoder.string_array(3)?,
        blood_groups: decoder.string_array(4)?,
        vitals: decoder.string_array(5)?,
        diagnoses: decoder.string_array(6)?,
        cids: decoder.string_array(7)?,
        owners: decoder.address_array(8)?,
    })
}

fn to_timestamp(raw: u64) -> Result<i64, RpcError> {
    i64::try_from(raw).map_err(|_| RpcError::Abi(format!("timestamp {} out of range", raw)))
}

fn timestamps(raw: Vec<u64>) -> Result<Vec<i64>, RpcError> {
    raw.into_iter().map(to_timestamp).collect()
}
