pub mod disabled_identity_provider;
pub mod supabase_identity_provider;
