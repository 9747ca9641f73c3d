/* toy-ircd - a toy IRC server written in Rust
*  Copyright (C) 2026 the toy-ircd authors

*  This program is free software: you can redistribute it and/or modify
*  it under the terms of the GNU Lesser General Public License as
*  published by the Free Software Foundation, either version 3 of the
*  License, or (at your option) any later version.

*  This program is distributed in the hope that it will be useful,
*  but WITHOUT ANY WARRANTY; without even the implied warranty of
*  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
*  GNU Lesser General Public License for more details.

*  You should have received a copy of the GNU Lesser General Public License
*  along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/
use core::pin::Pin;
use core::result::Result;
use core::task::{Context, Poll};
use tokio::io::Error as tioError;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf, ReadHalf, WriteHalf};
use tokio::net::TcpStream;

/* implement AsyncRead/Write on wrappers so that the rest of our code
 * need not care whether a connection is a real TCP socket or one end
 * of an in-process pipe (the test harness drives the server entirely
 * over pipes) */
#[derive(Debug)]
pub enum ReadHalfWrap {
    ClearText(ReadHalf<TcpStream>),
    Pipe(ReadHalf<DuplexStream>),
}

#[derive(Debug)]
pub enum WriteHalfWrap {
    ClearText(WriteHalf<TcpStream>),
    Pipe(WriteHalf<DuplexStream>),
}

impl AsyncRead for ReadHalfWrap {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context, buf: &mut ReadBuf) -> Poll<Result<(), tioError>> {
        let wrapper = Pin::into_inner(self);
        match wrapper {
            ReadHalfWrap::ClearText(inner) => AsyncRead::poll_read(Pin::new(inner), cx, buf),
            ReadHalfWrap::Pipe(inner) => AsyncRead::poll_read(Pin::new(inner), cx, buf),
        }
    }
}

impl AsyncWrite for WriteHalfWrap {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context,
        buf: &[u8],
    ) -> Poll<Result<usize, tioError>> {
        let wrapper = Pin::into_inner(self);
        match wrapper {
            WriteHalfWrap::ClearText(inner) => AsyncWrite::poll_write(Pin::new(inner), cx, buf),
            WriteHalfWrap::Pipe(inner) => AsyncWrite::poll_write(Pin::new(inner), cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Result<(), tioError>> {
        let wrapper = Pin::into_inner(self);
        match wrapper {
            WriteHalfWrap::ClearText(inner) => AsyncWrite::poll_flush(Pin::new(inner), cx),
            WriteHalfWrap::Pipe(inner) => AsyncWrite::poll_flush(Pin::new(inner), cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Result<(), tioError>> {
        let wrapper = Pin::into_inner(self);
        match wrapper {
            WriteHalfWrap::ClearText(inner) => AsyncWrite::poll_shutdown(Pin::new(inner), cx),
            WriteHalfWrap::Pipe(inner) => AsyncWrite::poll_shutdown(Pin::new(inner), cx),
        }
    }
}
