mod source_pipe;

pub use source_pipe::MicrophoneInput;
