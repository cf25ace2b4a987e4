// Data models shared by routing, coordination, storage and the server

mod agent;
mod interaction;
mod query;
mod response;
mod routing;

pub use agent::AgentDescriptor;
pub use interaction::{AgentInteraction, AgentInvocationResult, InteractionKind, COORDINATOR_ID};
pub use query::{HistoryRole, HistoryTurn, QueryContext};
pub use response::{
    AgentGap, ResponseSection, SynthesizedResponse, TurnFailure, TurnOutcome, TurnReport,
    SUMMARY_HEADING,
};
pub use routing::{AgentScore, CoordinationMode, PrimaryReason, RoutingDecision};
