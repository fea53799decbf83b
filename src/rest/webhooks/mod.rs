// rest/webhooks — Payment provider webhook handlers.
//
// Both providers sign the raw request body with HMAC-SHA256. Verification
// failures return HTTP 400; a missing signing secret is a deployment error
// and returns HTTP 500. Events are logged only — the subscriptions table
// lands together with the database layer.

pub mod razorpay;
pub mod stripe;
