use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domains::einvoice::error_handling::InvoiceApiError;

/// Invoice channels understood by the authority.
///
/// Serialized as the numeric code callers already store next to each invoice
/// (1 = electronic invoice, 2 = mobile cloud carrier, 3 = EasyCard, 4 = iPASS).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum InvoiceChannel {
    ElectronicInvoice,
    CloudCarrier,
    EasyCard,
    IPass,
}

/// Remote endpoints exposed by the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Single-invoice barcode verification.
    InvApp,
    /// Carrier detail and carrier header queries.
    InvServ,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::InvApp => "/invapp/InvApp",
            Endpoint::InvServ => "/invServ/InvServ",
        }
    }

    pub fn url(self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.path())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Endpoint::InvApp => "InvApp",
            Endpoint::InvServ => "InvServ",
        }
    }
}

impl InvoiceChannel {
    pub const ALL: [InvoiceChannel; 4] = [
        InvoiceChannel::ElectronicInvoice,
        InvoiceChannel::CloudCarrier,
        InvoiceChannel::EasyCard,
        InvoiceChannel::IPass,
    ];

    pub fn code(self) -> i64 {
        match self {
            InvoiceChannel::ElectronicInvoice => 1,
            InvoiceChannel::CloudCarrier => 2,
            InvoiceChannel::EasyCard => 3,
            InvoiceChannel::IPass => 4,
        }
    }

    /// Endpoint for single-invoice detail queries on this channel.
    pub fn detail_endpoint(self) -> Endpoint {
        match self {
            InvoiceChannel::ElectronicInvoice => Endpoint::InvApp,
            InvoiceChannel::CloudCarrier | InvoiceChannel::EasyCard | InvoiceChannel::IPass => {
                Endpoint::InvServ
            }
        }
    }

    /// `cardType` sent with carrier detail queries. The electronic invoice
    /// channel queries by barcode and has no carrier type.
    pub fn carrier_card_type(self) -> Option<&'static str> {
        match self {
            InvoiceChannel::ElectronicInvoice => None,
            InvoiceChannel::CloudCarrier => Some("3J0002"),
            InvoiceChannel::EasyCard => Some("1K0001"),
            InvoiceChannel::IPass => Some("1H0001"),
        }
    }

    /// `cardType` sent with carrier header queries.
    pub fn header_card_type(self) -> &'static str {
        match self {
            InvoiceChannel::ElectronicInvoice => "3J0001",
            InvoiceChannel::CloudCarrier => "3J0002",
            InvoiceChannel::EasyCard => "1K0001",
            InvoiceChannel::IPass => "1H0001",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceChannel::ElectronicInvoice => "electronic_invoice",
            InvoiceChannel::CloudCarrier => "cloud_carrier",
            InvoiceChannel::EasyCard => "easy_card",
            InvoiceChannel::IPass => "ipass",
        }
    }
}

impl TryFrom<i64> for InvoiceChannel {
    type Error = InvoiceApiError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(InvoiceChannel::ElectronicInvoice),
            2 => Ok(InvoiceChannel::CloudCarrier),
            3 => Ok(InvoiceChannel::EasyCard),
            4 => Ok(InvoiceChannel::IPass),
            other => Err(InvoiceApiError::unsupported_channel(other)),
        }
    }
}

impl From<InvoiceChannel> for i64 {
    fn from(channel: InvoiceChannel) -> Self {
        channel.code()
    }
}

impl FromStr for InvoiceChannel {
    type Err = InvoiceApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if let Ok(code) = value.parse::<i64>() {
            return InvoiceChannel::try_from(code);
        }

        InvoiceChannel::ALL
            .into_iter()
            .find(|channel| channel.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| InvoiceApiError::unsupported_channel(value))
    }
}

impl fmt::Display for InvoiceChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
