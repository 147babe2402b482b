//! Message filters used to select dispatcher deliveries.

use crate::message::{Message, MessageKind};
use crate::network::{NetId, NetworkType};

/// A predicate over decoded messages.
///
/// Every criterion left unset matches anything. An empty filter therefore
/// matches every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MessageFilter {
    network: Option<NetId>,
    network_type: Option<NetworkType>,
    kind: Option<MessageKind>,
    arb_id: Option<u32>,
}

impl MessageFilter {
    /// A filter that matches every message.
    pub fn any() -> Self {
        Self::default()
    }

    /// A filter matching a single network.
    pub fn for_network(network: NetId) -> Self {
        Self::default().network(network)
    }

    /// Restrict to a network.
    pub fn network(mut self, network: NetId) -> Self {
        self.network = Some(network);
        self
    }

    /// Restrict to a network family.
    pub fn network_type(mut self, network_type: NetworkType) -> Self {
        self.network_type = Some(network_type);
        self
    }

    /// Restrict to a message kind.
    pub fn kind(mut self, kind: MessageKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Restrict to CAN frames with this arbitration id.
    ///
    /// Non-CAN messages never match an arbitration id filter.
    pub fn arb_id(mut self, arb_id: u32) -> Self {
        self.arb_id = Some(arb_id);
        self
    }

    /// Check whether a message passes this filter.
    pub fn matches(&self, message: &Message) -> bool {
        let network = message.network();

        if self.network.is_some_and(|n| n != network) {
            return false;
        }
        if self
            .network_type
            .is_some_and(|t| t != network.network_type())
        {
            return false;
        }
        if self.kind.is_some_and(|k| k != message.kind()) {
            return false;
        }
        if let Some(arb_id) = self.arb_id {
            return message.as_can().is_some_and(|m| m.arb_id == arb_id);
        }

        true
    }
}

impl From<NetId> for MessageFilter {
    fn from(network: NetId) -> Self {
        Self::for_network(network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{CanMessage, ReadMemorySdMessage};

    fn can(network: NetId, arb_id: u32) -> Message {
        CanMessage::builder(network, arb_id).build().into()
    }

    #[test]
    fn test_any_matches_everything() {
        let filter = MessageFilter::any();
        assert!(filter.matches(&can(NetId::HsCan, 0x100)));
        assert!(filter.matches(&ReadMemorySdMessage::new(vec![0u8; 4]).into()));
    }

    #[test]
    fn test_network_filter() {
        let filter = MessageFilter::for_network(NetId::HsCan2);
        assert!(filter.matches(&can(NetId::HsCan2, 0x100)));
        assert!(!filter.matches(&can(NetId::HsCan, 0x100)));

        let sd = MessageFilter::from(NetId::NeoMemorySdRead);
        assert!(sd.matches(&ReadMemorySdMessage::new(vec![1, 2]).into()));
        assert!(!sd.matches(&can(NetId::HsCan, 0x1)));
    }

    #[test]
    fn test_network_type_and_kind() {
        let filter = MessageFilter::any()
            .network_type(NetworkType::Can)
            .kind(MessageKind::Can);
        assert!(filter.matches(&can(NetId::MsCan, 0x1)));
        assert!(!filter.matches(&ReadMemorySdMessage::new(vec![]).into()));
    }

    #[test]
    fn test_arb_id_filter() {
        let filter = MessageFilter::for_network(NetId::HsCan).arb_id(0x7E8);
        assert!(filter.matches(&can(NetId::HsCan, 0x7E8)));
        assert!(!filter.matches(&can(NetId::HsCan, 0x7E0)));
        assert!(!MessageFilter::any()
            .arb_id(0x7E8)
            .matches(&ReadMemorySdMessage::new(vec![]).into()));
    }
}
