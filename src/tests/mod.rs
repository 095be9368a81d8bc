// Test modules for nanobanana-client
//
// Each source file has a corresponding test file focused on business logic
// verification. End-to-end behavior against a mock HTTP server lives in the
// crate-level tests/ directory.
