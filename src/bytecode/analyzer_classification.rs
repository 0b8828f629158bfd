use std::collections::HashSet;

use super::selectors::{ERC1155_SELECTORS, ERC20_SELECTORS, ERC721_SELECTORS};
use super::types::{ContractType, FunctionSelector};

/// Classify a contract from its recognised selectors.
///
/// A token standard matches only when every selector of its set is present.
/// Otherwise the selector names decide between ownable, proxy and custom.
pub fn classify_contract(selectors: &[FunctionSelector]) -> ContractType {
    let present: HashSet<&str> = selectors
        .iter()
        .map(|s| s.selector.trim_start_matches("0x"))
        .collect();
    let has_all = |set: &[&str]| set.iter().all(|selector| present.contains(selector));

    if has_all(ERC20_SELECTORS) {
        return ContractType::Erc20;
    }
    if has_all(ERC721_SELECTORS) {
        return ContractType::Erc721;
    }
    if has_all(ERC1155_SELECTORS) {
        return ContractType::Erc1155;
    }

    let names: Vec<String> = selectors.iter().map(|s| s.name.to_lowercase()).collect();
    if names.iter().any(|name| name.contains("owner")) {
        ContractType::Ownable
    } else if names.iter().any(|name| name.contains("upgrade") || name.contains("implementation")) {
        ContractType::Proxy
    } else {
        ContractType::Custom
    }
}
