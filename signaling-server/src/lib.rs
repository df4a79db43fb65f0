/*!
Rendezvous server for [stranger-chat](https://docs.rs/stranger-chat).

Every WebSocket client gets a fresh session id. A client sending an unaddressed
`start` is either parked as the single waiting client, or, if someone is
already waiting, its `start` is relayed to them with `senderSessionId` set.
From then on the two clients address each other directly and the server only
forwards their messages, stamping the sender on each.
*/

pub mod rendezvous;
pub mod router;
