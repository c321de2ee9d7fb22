//! Enrollment input.

use color_eyre::eyre::WrapErr as _;
use tokio::io::{AsyncBufRead, AsyncBufReadExt as _, AsyncWrite, AsyncWriteExt as _};

/// What the user submitted to enroll this device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentInput {
    pub truck_number: String,
    pub pin: Option<String>,
}

/// Source of enrollment submissions.
#[trait_variant::make(Send)]
pub trait Enroller: Send {
    /// Ask for a truck number, showing the previous attempt's error if any.
    /// `None` means the user gave up.
    async fn request(&mut self, last_error: Option<&str>) -> Option<EnrollmentInput>;
}

/// Prompts on a terminal.
pub struct PromptEnroller<R, W> {
    input: R,
    output: W,
    ask_pin: bool,
}

impl PromptEnroller<tokio::io::BufReader<tokio::io::Stdin>, tokio::io::Stdout> {
    pub fn stdio(ask_pin: bool) -> Self {
        Self::new(
            tokio::io::BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
            ask_pin,
        )
    }
}

impl<R, W> PromptEnroller<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(input: R, output: W, ask_pin: bool) -> Self {
        Self {
            input,
            output,
            ask_pin,
        }
    }

    async fn prompt(&mut self, label: &str) -> color_eyre::eyre::Result<Option<String>> {
        self.output
            .write_all(label.as_bytes())
            .await
            .wrap_err("failed to write prompt")?;
        self.output.flush().await.wrap_err("failed to flush prompt")?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .await
            .wrap_err("failed to read input")?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    async fn ask(&mut self, last_error: Option<&str>) -> color_eyre::eyre::Result<Option<EnrollmentInput>> {
        if let Some(error) = last_error {
            self.output
                .write_all(format!("Enrollment failed: {error}\n").as_bytes())
                .await
                .wrap_err("failed to write error")?;
        }

        let Some(truck_number) = self
            .prompt("Truck number (empty line to quit): ")
            .await?
            .filter(|t| !t.is_empty())
        else {
            return Ok(None);
        };

        let pin = if self.ask_pin {
            self.prompt("PIN: ").await?.filter(|p| !p.is_empty())
        } else {
            None
        };

        Ok(Some(EnrollmentInput { truck_number, pin }))
    }
}

impl<R, W> Enroller for PromptEnroller<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn request(&mut self, last_error: Option<&str>) -> Option<EnrollmentInput> {
        match self.ask(last_error).await {
            Ok(input) => input,
            Err(e) => {
                tracing::warn!(error = %e, "enrollment prompt failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prompt_reads_truck_and_pin() {
        let input: &[u8] = b"4521\n0000\n";
        let mut output = Vec::new();
        let mut enroller = PromptEnroller::new(input, &mut output, true);

        let submitted = enroller.request(Some("Invalid PIN")).await;
        assert_eq!(
            submitted,
            Some(EnrollmentInput {
                truck_number: "4521".into(),
                pin: Some("0000".into()),
            })
        );
        drop(enroller);
        assert!(String::from_utf8(output).unwrap().contains("Invalid PIN"));
    }

    #[tokio::test]
    async fn test_empty_line_cancels() {
        let input: &[u8] = b"\n";
        let mut enroller = PromptEnroller::new(input, tokio::io::sink(), false);
        assert_eq!(enroller.request(None).await, None);
    }

    #[tokio::test]
    async fn test_end_of_input_cancels() {
        let input: &[u8] = b"";
        let mut enroller = PromptEnroller::new(input, tokio::io::sink(), false);
        assert_eq!(enroller.request(None).await, None);
    }
}
