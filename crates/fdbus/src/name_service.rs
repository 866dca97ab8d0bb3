// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 fdbus-rs contributors

//! Name-service wire contract.
//!
//! Message codes and parcelables exchanged with the name server (service
//! resolution) and the host server (host liveness). Other bus
//! implementations interoperate with these byte-for-byte: field order is
//! serialization order, strings are length-prefixed UTF-8, optional
//! sub-records are guarded by an always-emitted options byte.

use crate::parcel::{DecodeError, Deserializer, Parcelable, Serializer};

// ============================================================================
// Message codes
// ============================================================================

/// Name-server message codes (client perspective).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum NsMsgCode {
    ReqAllocServiceAddress = 0,
    ReqRegisterService = 1,
    ReqUnregisterService = 2,
    ReqQueryService = 3,
    ReqQueryServiceInterMachine = 4,
    ReqQueryHostLocal = 5,
    NtfServiceOnline = 6,
    NtfServiceOnlineInterMachine = 7,
    NtfMoreAddress = 8,
    NtfServiceOnlineMonitor = 9,
    NtfServiceOnlineMonitorInterMachine = 10,
    NtfHostOnlineLocal = 11,
    NtfHostInfo = 12,
}

impl NsMsgCode {
    pub fn from_u32(code: u32) -> Option<Self> {
        Some(match code {
            0 => Self::ReqAllocServiceAddress,
            1 => Self::ReqRegisterService,
            2 => Self::ReqUnregisterService,
            3 => Self::ReqQueryService,
            4 => Self::ReqQueryServiceInterMachine,
            5 => Self::ReqQueryHostLocal,
            6 => Self::NtfServiceOnline,
            7 => Self::NtfServiceOnlineInterMachine,
            8 => Self::NtfMoreAddress,
            9 => Self::NtfServiceOnlineMonitor,
            10 => Self::NtfServiceOnlineMonitorInterMachine,
            11 => Self::NtfHostOnlineLocal,
            12 => Self::NtfHostInfo,
            _ => return None,
        })
    }
}

/// Host-server message codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum HsMsgCode {
    ReqRegisterHost = 0,
    ReqUnregisterHost = 1,
    ReqQueryHost = 2,
    ReqHeartbeatOk = 3,
    ReqHostReady = 4,
    NtfHostOnline = 5,
    NtfHeartBeat = 6,
}

impl HsMsgCode {
    pub fn from_u32(code: u32) -> Option<Self> {
        Some(match code {
            0 => Self::ReqRegisterHost,
            1 => Self::ReqUnregisterHost,
            2 => Self::ReqQueryHost,
            3 => Self::ReqHeartbeatOk,
            4 => Self::ReqHostReady,
            5 => Self::NtfHostOnline,
            6 => Self::NtfHeartBeat,
            _ => return None,
        })
    }
}

/// Options bit guarding the optional `token_list` sub-record.
pub const OPT_TOKEN_LIST: u8 = 1 << 0;

/// No transport encryption; tokens travel as plain strings.
pub const CRYPTO_NONE: u8 = 0;

/// Decode the options byte, rejecting bits outside `allowed`.
fn get_options(d: &mut Deserializer<'_>, allowed: u8) -> Result<u8, DecodeError> {
    let options = d.get_u8()?;
    if options & !allowed != 0 {
        return Err(DecodeError::UnknownOption);
    }
    Ok(options)
}

// ============================================================================
// Parcelables
// ============================================================================

/// Authentication token set plus the algorithm securing the channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FdbMsgTokens {
    pub crypto_algorithm: u8,
    pub tokens: Vec<String>,
}

impl Parcelable for FdbMsgTokens {
    fn serialize(&self, s: &mut Serializer) {
        s.put_u8(self.crypto_algorithm);
        s.put_array(&self.tokens);
    }

    fn deserialize(d: &mut Deserializer<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            crypto_algorithm: d.get_u8()?,
            tokens: d.get_array()?,
        })
    }
}

/// Resolution result for one service: where it can be dialed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FdbMsgAddressList {
    pub service_name: String,
    pub host_name: String,
    pub is_local: bool,
    pub address_list: Vec<String>,
    pub token_list: Option<FdbMsgTokens>,
}

impl Parcelable for FdbMsgAddressList {
    fn serialize(&self, s: &mut Serializer) {
        s.put_str(&self.service_name);
        s.put_str(&self.host_name);
        s.put_bool(self.is_local);
        s.put_array(&self.address_list);
        let options = if self.token_list.is_some() {
            OPT_TOKEN_LIST
        } else {
            0
        };
        s.put_u8(options);
        if let Some(tokens) = &self.token_list {
            tokens.serialize(s);
        }
    }

    fn deserialize(d: &mut Deserializer<'_>) -> Result<Self, DecodeError> {
        let service_name = d.get_str()?;
        let host_name = d.get_str()?;
        let is_local = d.get_bool()?;
        let address_list = d.get_array()?;
        let options = get_options(d, OPT_TOKEN_LIST)?;
        let token_list = if options & OPT_TOKEN_LIST != 0 {
            Some(FdbMsgTokens::deserialize(d)?)
        } else {
            None
        };
        Ok(Self {
            service_name,
            host_name,
            is_local,
            address_list,
            token_list,
        })
    }
}

/// One host as known to the name server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FdbMsgHostAddress {
    pub ip_address: String,
    pub ns_url: String,
    pub host_name: String,
    pub token_list: Option<FdbMsgTokens>,
}

impl Parcelable for FdbMsgHostAddress {
    fn serialize(&self, s: &mut Serializer) {
        s.put_str(&self.ip_address);
        s.put_str(&self.ns_url);
        s.put_str(&self.host_name);
        let options = if self.token_list.is_some() {
            OPT_TOKEN_LIST
        } else {
            0
        };
        s.put_u8(options);
        if let Some(tokens) = &self.token_list {
            tokens.serialize(s);
        }
    }

    fn deserialize(d: &mut Deserializer<'_>) -> Result<Self, DecodeError> {
        let ip_address = d.get_str()?;
        let ns_url = d.get_str()?;
        let host_name = d.get_str()?;
        let options = get_options(d, OPT_TOKEN_LIST)?;
        let token_list = if options & OPT_TOKEN_LIST != 0 {
            Some(FdbMsgTokens::deserialize(d)?)
        } else {
            None
        };
        Ok(Self {
            ip_address,
            ns_url,
            host_name,
            token_list,
        })
    }
}

/// Host-registration acknowledgement, optionally carrying tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FdbMsgHostRegisterAck {
    pub token_list: Option<FdbMsgTokens>,
}

impl Parcelable for FdbMsgHostRegisterAck {
    fn serialize(&self, s: &mut Serializer) {
        let options = if self.token_list.is_some() {
            OPT_TOKEN_LIST
        } else {
            0
        };
        s.put_u8(options);
        if let Some(tokens) = &self.token_list {
            tokens.serialize(s);
        }
    }

    fn deserialize(d: &mut Deserializer<'_>) -> Result<Self, DecodeError> {
        let options = get_options(d, OPT_TOKEN_LIST)?;
        let token_list = if options & OPT_TOKEN_LIST != 0 {
            Some(FdbMsgTokens::deserialize(d)?)
        } else {
            None
        };
        Ok(Self { token_list })
    }
}

/// Service name carried by queries and registrations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FdbMsgServerName {
    pub name: String,
}

impl Parcelable for FdbMsgServerName {
    fn serialize(&self, s: &mut Serializer) {
        s.put_str(&self.name);
    }

    fn deserialize(d: &mut Deserializer<'_>) -> Result<Self, DecodeError> {
        Ok(Self { name: d.get_str()? })
    }
}

/// Host name carried by host-info notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FdbMsgHostInfo {
    pub name: String,
}

impl Parcelable for FdbMsgHostInfo {
    fn serialize(&self, s: &mut Serializer) {
        s.put_str(&self.name);
    }

    fn deserialize(d: &mut Deserializer<'_>) -> Result<Self, DecodeError> {
        Ok(Self { name: d.get_str()? })
    }
}

/// Hosts currently online.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FdbMsgHostAddressList {
    pub address_list: Vec<FdbMsgHostAddress>,
}

impl Parcelable for FdbMsgHostAddressList {
    fn serialize(&self, s: &mut Serializer) {
        s.put_array(&self.address_list);
    }

    fn deserialize(d: &mut Deserializer<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            address_list: d.get_array()?,
        })
    }
}

/// A service together with the host that exports it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FdbMsgServiceInfo {
    pub service_addr: FdbMsgAddressList,
    pub host_addr: FdbMsgHostAddress,
}

impl Parcelable for FdbMsgServiceInfo {
    fn serialize(&self, s: &mut Serializer) {
        self.service_addr.serialize(s);
        self.host_addr.serialize(s);
    }

    fn deserialize(d: &mut Deserializer<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            service_addr: FdbMsgAddressList::deserialize(d)?,
            host_addr: FdbMsgHostAddress::deserialize(d)?,
        })
    }
}

/// Full service table snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FdbMsgServiceTable {
    pub service_tbl: Vec<FdbMsgServiceInfo>,
}

impl Parcelable for FdbMsgServiceTable {
    fn serialize(&self, s: &mut Serializer) {
        s.put_array(&self.service_tbl);
    }

    fn deserialize(d: &mut Deserializer<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            service_tbl: d.get_array()?,
        })
    }
}

/// Sideband authentication push (`FDB_SIDEBAND_AUTH`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FdbAuthentication {
    pub token_list: Option<FdbMsgTokens>,
}

impl Parcelable for FdbAuthentication {
    fn serialize(&self, s: &mut Serializer) {
        let options = if self.token_list.is_some() {
            OPT_TOKEN_LIST
        } else {
            0
        };
        s.put_u8(options);
        if let Some(tokens) = &self.token_list {
            tokens.serialize(s);
        }
    }

    fn deserialize(d: &mut Deserializer<'_>) -> Result<Self, DecodeError> {
        let options = get_options(d, OPT_TOKEN_LIST)?;
        let token_list = if options & OPT_TOKEN_LIST != 0 {
            Some(FdbMsgTokens::deserialize(d)?)
        } else {
            None
        };
        Ok(Self { token_list })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> FdbMsgTokens {
        FdbMsgTokens {
            crypto_algorithm: CRYPTO_NONE,
            tokens: vec!["t1".into(), "t2".into()],
        }
    }

    #[test]
    fn address_list_roundtrip() {
        let msg = FdbMsgAddressList {
            service_name: "media".into(),
            host_name: "nodeA".into(),
            is_local: false,
            address_list: vec!["tcp://10.0.0.2:7000".into(), "domain://run/media".into()],
            token_list: Some(tokens()),
        };
        assert_eq!(FdbMsgAddressList::decode(&msg.encode()).unwrap(), msg);
    }

    #[test]
    fn address_list_roundtrip_empty_fields() {
        let msg = FdbMsgAddressList::default();
        let bytes = msg.encode();
        assert_eq!(FdbMsgAddressList::decode(&bytes).unwrap(), msg);
        // service_name len, host_name len, is_local, count, options
        assert_eq!(bytes, [0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn options_byte_is_always_emitted() {
        let without = FdbMsgHostRegisterAck::default().encode();
        assert_eq!(without, [0]);

        let with = FdbMsgHostRegisterAck {
            token_list: Some(tokens()),
        }
        .encode();
        assert_eq!(with[0], OPT_TOKEN_LIST);
        assert!(with.len() > 1);
    }

    #[test]
    fn token_list_is_idempotent() {
        // Assigning the same token list twice must not change the encoding.
        let mut msg = FdbMsgAddressList {
            service_name: "svc".into(),
            ..Default::default()
        };
        msg.token_list = Some(tokens());
        let once = msg.encode();
        msg.token_list = Some(tokens());
        assert_eq!(msg.encode(), once);
    }

    #[test]
    fn unknown_option_bit_is_rejected() {
        let mut bytes = FdbMsgAddressList {
            service_name: "x".into(),
            ..Default::default()
        }
        .encode();
        let options_at = bytes.len() - 1;
        bytes[options_at] = 0x80;
        assert_eq!(
            FdbMsgAddressList::decode(&bytes),
            Err(DecodeError::UnknownOption)
        );
    }

    #[test]
    fn truncated_address_list_is_rejected() {
        let msg = FdbMsgAddressList {
            service_name: "media".into(),
            host_name: "nodeA".into(),
            is_local: true,
            address_list: vec!["tcp://1.2.3.4:5".into()],
            token_list: None,
        };
        let bytes = msg.encode();
        for cut in 0..bytes.len() {
            assert!(
                FdbMsgAddressList::decode(&bytes[..cut]).is_err(),
                "prefix of {} bytes decoded",
                cut
            );
        }
    }

    #[test]
    fn host_address_roundtrip() {
        let msg = FdbMsgHostAddress {
            ip_address: "192.168.1.7".into(),
            ns_url: "tcp://192.168.1.7:60000".into(),
            host_name: "nodeB".into(),
            token_list: None,
        };
        assert_eq!(FdbMsgHostAddress::decode(&msg.encode()).unwrap(), msg);
    }

    #[test]
    fn service_table_roundtrip() {
        let msg = FdbMsgServiceTable {
            service_tbl: vec![
                FdbMsgServiceInfo {
                    service_addr: FdbMsgAddressList {
                        service_name: "media".into(),
                        host_name: "nodeA".into(),
                        is_local: true,
                        address_list: vec!["domain://run/media".into()],
                        token_list: None,
                    },
                    host_addr: FdbMsgHostAddress {
                        ip_address: "127.0.0.1".into(),
                        ns_url: "tcp://127.0.0.1:60000".into(),
                        host_name: "nodeA".into(),
                        token_list: Some(tokens()),
                    },
                },
                FdbMsgServiceInfo::default(),
            ],
        };
        assert_eq!(FdbMsgServiceTable::decode(&msg.encode()).unwrap(), msg);
    }

    #[test]
    fn host_address_list_roundtrip() {
        let msg = FdbMsgHostAddressList {
            address_list: vec![FdbMsgHostAddress::default(), FdbMsgHostAddress {
                ip_address: "10.1.1.1".into(),
                ns_url: "tcp://10.1.1.1:60000".into(),
                host_name: "edge".into(),
                token_list: None,
            }],
        };
        assert_eq!(FdbMsgHostAddressList::decode(&msg.encode()).unwrap(), msg);
    }

    #[test]
    fn server_name_and_host_info_roundtrip() {
        let name = FdbMsgServerName {
            name: "media".into(),
        };
        assert_eq!(FdbMsgServerName::decode(&name.encode()).unwrap(), name);

        let host = FdbMsgHostInfo { name: "".into() };
        assert_eq!(FdbMsgHostInfo::decode(&host.encode()).unwrap(), host);
    }

    #[test]
    fn authentication_roundtrip() {
        let msg = FdbAuthentication {
            token_list: Some(tokens()),
        };
        let back = FdbAuthentication::decode(&msg.encode()).unwrap();
        assert_eq!(back, msg);
        let t = back.token_list.unwrap();
        assert_eq!(t.crypto_algorithm, CRYPTO_NONE);
        assert_eq!(t.tokens, ["t1", "t2"]);
    }

    #[test]
    fn code_mapping_is_stable() {
        assert_eq!(NsMsgCode::ReqQueryService as u32, 3);
        assert_eq!(NsMsgCode::NtfServiceOnline as u32, 6);
        assert_eq!(NsMsgCode::NtfHostInfo as u32, 12);
        assert_eq!(NsMsgCode::from_u32(7), Some(NsMsgCode::NtfServiceOnlineInterMachine));
        assert_eq!(NsMsgCode::from_u32(13), None);

        assert_eq!(HsMsgCode::NtfHeartBeat as u32, 6);
        assert_eq!(HsMsgCode::from_u32(4), Some(HsMsgCode::ReqHostReady));
        assert_eq!(HsMsgCode::from_u32(7), None);
    }
}
