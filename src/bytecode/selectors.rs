// Known function selectors
//
// Static table of standard-interface and administrative selectors recognised
// by the dispatcher scan, plus the selector sets used for contract
// classification.

use super::types::FunctionSelector;

/// Entry of the known-selector table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownSelector {
    /// 4-byte selector as lowercase hex, no prefix
    pub selector: &'static str,
    /// Canonical signature
    pub signature: &'static str,
    /// Return types
    pub outputs: &'static [&'static str],
}

const fn known(
    selector: &'static str,
    signature: &'static str,
    outputs: &'static [&'static str],
) -> KnownSelector {
    KnownSelector { selector, signature, outputs }
}

/// Known selectors, grouped by the interface that defines them
pub static KNOWN_SELECTORS: &[KnownSelector] = &[
    // ERC-20
    known("a9059cbb", "transfer(address,uint256)", &["bool"]),
    known("095ea7b3", "approve(address,uint256)", &["bool"]),
    known("23b872dd", "transferFrom(address,address,uint256)", &["bool"]),
    known("70a08231", "balanceOf(address)", &["uint256"]),
    known("18160ddd", "totalSupply()", &["uint256"]),
    known("dd62ed3e", "allowance(address,address)", &["uint256"]),
    known("06fdde03", "name()", &["string"]),
    known("95d89b41", "symbol()", &["string"]),
    known("313ce567", "decimals()", &["uint8"]),
    known("40c10f19", "mint(address,uint256)", &[]),
    known("42966c68", "burn(uint256)", &[]),
    known("79cc6790", "burnFrom(address,uint256)", &[]),
    // ERC-721
    known("6352211e", "ownerOf(uint256)", &["address"]),
    known("42842e0e", "safeTransferFrom(address,address,uint256)", &[]),
    known("b88d4fde", "safeTransferFrom(address,address,uint256,bytes)", &[]),
    known("a22cb465", "setApprovalForAll(address,bool)", &[]),
    known("081812fc", "getApproved(uint256)", &["address"]),
    known("e985e9c5", "isApprovedForAll(address,address)", &["bool"]),
    known("c87b56dd", "tokenURI(uint256)", &["string"]),
    known("01ffc9a7", "supportsInterface(bytes4)", &["bool"]),
    // ERC-1155
    known("00fdd58e", "balanceOf(address,uint256)", &["uint256"]),
    known("4e1273f4", "balanceOfBatch(address[],uint256[])", &["uint256[]"]),
    known("f242432a", "safeTransferFrom(address,address,uint256,uint256,bytes)", &[]),
    known("2eb2c2d6", "safeBatchTransferFrom(address,address,uint256[],uint256[],bytes)", &[]),
    known("0e89341c", "uri(uint256)", &["string"]),
    // Ownable
    known("8da5cb5b", "owner()", &["address"]),
    known("f2fde38b", "transferOwnership(address)", &[]),
    known("715018a6", "renounceOwnership()", &[]),
    known("e30c3978", "pendingOwner()", &["address"]),
    known("79ba5097", "acceptOwnership()", &[]),
    // Pausable
    known("8456cb59", "pause()", &[]),
    known("3f4ba83a", "unpause()", &[]),
    known("5c975abb", "paused()", &["bool"]),
    // AccessControl
    known("2f2ff15d", "grantRole(bytes32,address)", &[]),
    known("d547741f", "revokeRole(bytes32,address)", &[]),
    known("36568abe", "renounceRole(bytes32,address)", &[]),
    known("91d14854", "hasRole(bytes32,address)", &["bool"]),
    known("248a9ca3", "getRoleAdmin(bytes32)", &["bytes32"]),
    known("a217fddf", "DEFAULT_ADMIN_ROLE()", &["bytes32"]),
    // Proxies and upgrades
    known("3659cfe6", "upgradeTo(address)", &[]),
    known("4f1ef286", "upgradeToAndCall(address,bytes)", &[]),
    known("5c60da1b", "implementation()", &["address"]),
    known("f851a440", "admin()", &["address"]),
    known("8f283970", "changeAdmin(address)", &[]),
    known("52d1902d", "proxiableUUID()", &["bytes32"]),
    known("8129fc1c", "initialize()", &[]),
];

/// Selectors that administer an upgradeable proxy
pub static UPGRADE_ADMIN_SELECTORS: &[&str] = &[
    "3659cfe6", // upgradeTo(address)
    "4f1ef286", // upgradeToAndCall(address,bytes)
    "8f283970", // changeAdmin(address)
    "52d1902d", // proxiableUUID()
    "5c60da1b", // implementation()
];

/// Selectors every ERC-20 token exposes
pub static ERC20_SELECTORS: &[&str] = &[
    "a9059cbb", "095ea7b3", "23b872dd", "70a08231", "18160ddd", "dd62ed3e",
];

/// Selectors every ERC-721 token exposes
pub static ERC721_SELECTORS: &[&str] = &[
    "70a08231", "6352211e", "42842e0e", "b88d4fde", "23b872dd", "095ea7b3",
    "a22cb465", "081812fc", "e985e9c5",
];

/// Selectors every ERC-1155 token exposes
pub static ERC1155_SELECTORS: &[&str] = &[
    "00fdd58e", "4e1273f4", "a22cb465", "e985e9c5", "f242432a", "2eb2c2d6",
];

/// Look up a selector (lowercase hex, no prefix) in the known table
pub fn lookup(selector: &str) -> Option<&'static KnownSelector> {
    KNOWN_SELECTORS
        .iter()
        .find(|entry| entry.selector.eq_ignore_ascii_case(selector))
}

/// Split a canonical signature into its function name and input types
pub fn parse_signature(signature: &str) -> (String, Vec<String>) {
    let Some((name, rest)) = signature.split_once('(') else {
        return (signature.to_string(), Vec::new());
    };
    let args = rest.trim_end_matches(')');
    let inputs = if args.is_empty() {
        Vec::new()
    } else {
        args.split(',').map(|arg| arg.trim().to_string()).collect()
    };
    (name.to_string(), inputs)
}

impl From<&KnownSelector> for FunctionSelector {
    fn from(entry: &KnownSelector) -> Self {
        let (name, inputs) = parse_signature(entry.signature);
        FunctionSelector {
            selector: format!("0x{}", entry.selector),
            signature: entry.signature.to_string(),
            name,
            inputs,
            outputs: entry.outputs.iter().map(|o| o.to_string()).collect(),
        }
    }
}
